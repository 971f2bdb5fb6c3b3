//! 相对地址转绝对地址
//!
//! 录制时把 `src`/`href`/`srcset` 和样式里的 `url(...)` 按文档地址解析成绝对地址，
//! 回放文档换了宿主之后资源仍然指向原站点。

use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

static URL_MATCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(["']?(.*?)["']?\)"#).expect("URL_MATCH is a valid pattern")
});

/// 文档地址作为解析基准；不能作基准的地址（如 `about:blank`）返回 None。
pub(crate) fn document_base(href: &str) -> Option<Url> {
    Url::parse(href).ok().filter(|url| !url.cannot_be_a_base())
}

pub fn absolute_to_doc(value: &str, base: Option<&Url>) -> String {
    match base.and_then(|b| b.join(value).ok()) {
        Some(url) => url.into(),
        None => value.to_string(),
    }
}

pub fn absolute_to_stylesheet(css: &str, base: Option<&Url>) -> String {
    URL_MATCH
        .replace_all(css, |caps: &Captures<'_>| {
            let path = caps.get(1).map_or("", |m| m.as_str());
            if path.is_empty() {
                return caps[0].to_string();
            }
            format!("url({})", absolute_to_doc(path, base))
        })
        .into_owned()
}

pub fn absolute_to_srcset(value: &str, base: Option<&Url>) -> String {
    value
        .split(',')
        .map(|candidate| {
            let mut parts = candidate.split_whitespace();
            let url = parts.next().unwrap_or_default();
            let size = parts.next().unwrap_or_default();
            format!("{} {}", absolute_to_doc(url, base), size)
                .trim()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// 按属性名转换属性值
pub fn transform_attr(name: &str, value: &str, base: Option<&Url>) -> String {
    match name {
        "src" | "href" => absolute_to_doc(value, base),
        "srcset" => absolute_to_srcset(value, base),
        "style" => absolute_to_stylesheet(value, base),
        _ => value.to_string(),
    }
}
