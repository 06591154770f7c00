use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::util::page::PARAMETER_COUNT;

pub mod aps;

/// 一次上传对应的对象描述，转换任务提交后即丢弃
#[derive(Debug, Clone)]
pub struct ObjectDescriptor {
    pub object_name: String,
    pub local_path: PathBuf,
    pub bucket_key: String,
}

/// 参数表单原始输入
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParameterForm {
    #[serde(default)]
    pub filename: String,
    pub param1: Option<String>,
    pub param2: Option<String>,
    pub param3: Option<String>,
    pub param4: Option<String>,
    pub param5: Option<String>,
    pub param6: Option<String>,
}

/// 参数表单解析结果，仅在当前请求内传递
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelParameters {
    pub filename: String,
    pub params: [Option<f64>; PARAMETER_COUNT],
}

impl ModelParameters {
    /// 解析表单；空值视为未填写，非数字返回出错的字段名
    pub fn from_form(form: &ParameterForm) -> Result<Self, String> {
        let raw = [
            &form.param1,
            &form.param2,
            &form.param3,
            &form.param4,
            &form.param5,
            &form.param6,
        ];

        let mut params = [None; PARAMETER_COUNT];
        for (index, value) in raw.iter().enumerate() {
            let Some(text) = value.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
                continue;
            };
            let parsed = text
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("param{}", index + 1))?;
            params[index] = Some(parsed);
        }

        Ok(Self {
            filename: form.filename.trim().to_string(),
            params,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime: u64,
    pub timestamp: String,
    pub bucket: String,
}
