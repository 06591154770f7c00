//! API工具函数模块
//! 对象命名、上传文件名校验等处理函数共用的逻辑

use chrono::Utc;
use nanoid::nanoid;
use std::path::Path;

const OBJECT_NAME_RANDOM_ALPHABET: &[char] = &[
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J',
    'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
];
const OBJECT_NAME_RANDOM_LEN: usize = 8;
const MAX_EXTENSION_LEN: usize = 16;
const MAX_OBJECT_NAME_LEN: usize = 128;

/// 为每次上传生成唯一的对象名
///
/// 格式：{13位毫秒时间戳}{8位大写随机码}[.扩展名]
/// 扩展名沿用原始文件名（小写），APS 据此识别文件格式
pub fn generate_object_name(original_filename: &str) -> String {
    let timestamp = format!("{:013}", Utc::now().timestamp_millis().abs());
    let random = nanoid!(OBJECT_NAME_RANDOM_LEN, OBJECT_NAME_RANDOM_ALPHABET);
    match sanitize_extension(original_filename) {
        Some(ext) => format!("{}{}.{}", timestamp, random, ext),
        None => format!("{}{}", timestamp, random),
    }
}

/// 提取并清洗扩展名，只保留 ASCII 字母数字
pub fn sanitize_extension(original_filename: &str) -> Option<String> {
    // 浏览器可能带上客户端路径
    let base = original_filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_filename);
    let ext = Path::new(base).extension()?.to_str()?;
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// 校验上传目录中的对象名，拒绝路径穿越与隐藏文件
pub fn is_valid_upload_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_OBJECT_NAME_LEN
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// 列出上传目录中的文件名，按名称倒序（时间戳前缀即最新在前）
pub async fn list_uploaded_names(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
        Err(e) => return Err(e),
    };

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if is_valid_upload_name(name) {
                names.push(name.to_string());
            }
        }
    }

    names.sort_unstable_by(|a, b| b.cmp(a));
    Ok(names)
}

/// 只保留最新的 `keep` 个上传文件，返回被删除的文件名
pub async fn prune_uploads(dir: &Path, keep: usize) -> std::io::Result<Vec<String>> {
    let names = list_uploaded_names(dir).await?;
    let mut removed = Vec::new();
    for name in names.into_iter().skip(keep) {
        match tokio::fs::remove_file(dir.join(&name)).await {
            Ok(()) => removed.push(name),
            // 并发请求可能已删除
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_object_name() {
        let name = generate_object_name("C:\\Users\\me\\Bracket.F3D");
        assert!(name.chars().next().unwrap().is_ascii_digit());
        assert_eq!(name.len(), 13 + OBJECT_NAME_RANDOM_LEN + ".f3d".len());
        assert!(name.ends_with(".f3d"));
        assert!(is_valid_upload_name(&name));

        assert_ne!(generate_object_name("a.dwg"), generate_object_name("a.dwg"));
        assert_eq!(generate_object_name("noext").len(), 13 + OBJECT_NAME_RANDOM_LEN);
    }

    #[test]
    fn test_sanitize_extension() {
        assert_eq!(sanitize_extension("model.STEP"), Some("step".to_string()));
        assert_eq!(sanitize_extension("dir/part.ipt"), Some("ipt".to_string()));
        assert_eq!(sanitize_extension("bad.ex t"), None);
        assert_eq!(sanitize_extension(".hidden"), None);
        assert_eq!(sanitize_extension("model."), None);
    }

    #[test]
    fn test_is_valid_upload_name() {
        assert!(is_valid_upload_name("1760000000000ABCDEFGH.f3d"));
        assert!(is_valid_upload_name("current_model-v2.rvt"));
        assert!(!is_valid_upload_name(""));
        assert!(!is_valid_upload_name("../secret"));
        assert!(!is_valid_upload_name("a/b.f3d"));
        assert!(!is_valid_upload_name(".env"));
        assert!(!is_valid_upload_name("模型.f3d"));
    }

    #[tokio::test]
    async fn test_list_uploaded_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1700000000000AAAAAAAA.f3d"), b"a").unwrap();
        std::fs::write(dir.path().join("1760000000000BBBBBBBB.dwg"), b"b").unwrap();
        std::fs::write(dir.path().join(".partial"), b"c").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let names = list_uploaded_names(dir.path()).await.unwrap();
        assert_eq!(
            names,
            vec![
                "1760000000000BBBBBBBB.dwg".to_string(),
                "1700000000000AAAAAAAA.f3d".to_string()
            ]
        );

        let missing = list_uploaded_names(&dir.path().join("missing")).await.unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_prune_uploads_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let names = [
            "1700000000000AAAAAAAA.f3d",
            "1710000000000BBBBBBBB.dwg",
            "1720000000000CCCCCCCC.rvt",
            "1730000000000DDDDDDDD.f3d",
        ];
        for name in names {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::write(dir.path().join(".partial"), b"x").unwrap();

        let removed = prune_uploads(dir.path(), 3).await.unwrap();
        assert_eq!(removed, vec!["1700000000000AAAAAAAA.f3d".to_string()]);

        let remaining = list_uploaded_names(dir.path()).await.unwrap();
        assert_eq!(remaining.len(), 3);
        assert_eq!(remaining[0], "1730000000000DDDDDDDD.f3d");
        assert!(dir.path().join(".partial").exists());

        assert!(prune_uploads(dir.path(), 3).await.unwrap().is_empty());
    }
}
