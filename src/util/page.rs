//! 页面渲染模块
//! 上传表单、参数表单使用 build_html 构建；Viewer 页面是固定模板，
//! 通过 `{{name}}` 占位符做简单替换。

use crate::aps::DesignUrn;
use build_html::{Html, HtmlContainer, HtmlPage};

const VIEWER_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>APS Viewer</title>
  <script src="https://developer.api.autodesk.com/modelderivative/v2/viewers/{{viewer_version}}/viewer3D.min.js"></script>
  <link rel="stylesheet" href="https://developer.api.autodesk.com/modelderivative/v2/viewers/{{viewer_version}}/style.min.css">
  <style>html,body,#viewer{margin:0;padding:0;width:100%;height:100%;}</style>
</head>
<body>
  <div id="viewer"></div>
  <script>
    const options = {
      env: 'AutodeskProduction',
      accessToken: '{{token}}'
    };
    const viewerDiv = document.getElementById('viewer');
    const viewer = new Autodesk.Viewing.GuiViewer3D(viewerDiv);
    console.log("URN:", '{{urn}}');
    Autodesk.Viewing.Initializer(options, () => {
      viewer.start();
      const documentId = 'urn:{{urn}}';
      Autodesk.Viewing.Document.load(documentId,
        doc => {
          const defaultModel = doc.getRoot().getDefaultGeometry();
          viewer.loadDocumentNode(doc, defaultModel);
        },
        err => console.error(err)
      );
    });
  </script>
</body>
</html>
"#;

const FORM_CSS: &str = "body{font-family:sans-serif;margin:2em;}label{display:inline-block;min-width:6em;}form div{margin:.4em 0;}";

/// 参数表单中的数值参数个数
pub const PARAMETER_COUNT: usize = 6;

/// 页面渲染器
pub struct PageRenderer;

impl PageRenderer {
    /// 渲染 Viewer 页面
    ///
    /// token 与 urn 都由服务端生成，按原样替换进内联脚本。
    pub fn viewer(token: &str, urn: &DesignUrn, viewer_version: &str) -> String {
        VIEWER_TEMPLATE
            .replace("{{viewer_version}}", viewer_version)
            .replace("{{token}}", token)
            .replace("{{urn}}", urn.as_str())
    }

    /// 文件上传表单
    pub fn upload_form(max_upload_mb: u64) -> String {
        let mut html = Self::base_page("Upload a model");
        html.add_raw("<h2>Upload a File</h2>");
        html.add_raw(&format!(
            "<p>Each upload is stored as a new object and translated for viewing (max {} MB).</p>",
            max_upload_mb
        ));
        html.add_raw(
            r#"<form method="post" enctype="multipart/form-data">
  <input type="file" name="file">
  <input type="submit" value="Upload">
</form>"#,
        );
        html.add_raw(r#"<p><a href="/params">Translate an uploaded file with parameters</a></p>"#);
        html.to_html_string()
    }

    /// 文件名 + 六个数值参数的表单
    ///
    /// `uploaded` 为上传目录中已有的对象名，作为文件名输入框的候选项。
    pub fn parameter_form(uploaded: &[String]) -> String {
        let mut html = Self::base_page("Model parameters");
        html.add_raw("<h2>Translate an uploaded file</h2>");

        let mut form = String::from(r#"<form method="post">"#);
        form.push_str(
            r#"<div><label for="filename">File name:</label><input type="text" id="filename" name="filename" list="uploaded-files"></div>"#,
        );
        for i in 1..=PARAMETER_COUNT {
            form.push_str(&format!(
                r#"<div><label for="param{i}">Param {i}:</label><input type="number" step="any" id="param{i}" name="param{i}"></div>"#
            ));
        }
        form.push_str(r#"<input type="submit" value="Submit"></form>"#);
        html.add_raw(&form);

        let mut datalist = String::from(r#"<datalist id="uploaded-files">"#);
        for name in uploaded {
            datalist.push_str(&format!(r#"<option value="{}">"#, name));
        }
        datalist.push_str("</datalist>");
        html.add_raw(&datalist);

        html.to_html_string()
    }

    fn base_page(title: &str) -> HtmlPage {
        HtmlPage::new()
            .with_title(title)
            .with_meta(vec![("charset", "utf-8")])
            .with_style(FORM_CSS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_embeds_token_and_urn() {
        let urn = DesignUrn::from_object_id("urn:adsk.objects:os.object:bucket62218/current.f3d");
        let page = PageRenderer::viewer("token-abc", &urn, "7.*");

        assert!(page.contains("accessToken: 'token-abc'"));
        assert!(page.contains(&format!("'urn:{}'", urn.as_str())));
        assert!(page.contains("/viewers/7.*/viewer3D.min.js"));
        assert!(!page.contains("{{"));
    }

    #[test]
    fn test_upload_form_is_multipart() {
        let page = PageRenderer::upload_form(200);
        assert!(page.contains(r#"enctype="multipart/form-data""#));
        assert!(page.contains(r#"name="file""#));
        assert!(page.contains("200 MB"));
    }

    #[test]
    fn test_parameter_form_fields() {
        let page = PageRenderer::parameter_form(&["1760000000000ABCDEFGH.f3d".to_string()]);
        assert!(page.contains(r#"name="filename""#));
        for i in 1..=PARAMETER_COUNT {
            assert!(page.contains(&format!(r#"name="param{}""#, i)));
        }
        assert!(!page.contains(r#"name="param7""#));
        assert!(page.contains(r#"<option value="1760000000000ABCDEFGH.f3d">"#));
    }
}
