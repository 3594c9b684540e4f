use http::{HeaderMap, HeaderName};

/// 检查给定的头部是否应该在转发中被排除
///
/// Hop-by-hop headers only describe a single connection, forwarding them
/// to the origin or back to the client would break either side.
pub fn is_exclude_header(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "host"
            | "connection"
            | "proxy-authenticate"
            | "upgrade"
            | "proxy-authorization"
            | "keep-alive"
            | "transfer-encoding"
            | "te"
    )
}

/// 复制 HTTP 头部，排除 hop-by-hop 头部
///
/// # 参数
///
/// * `from` - 源头部映射
/// * `to` - 目标头部映射
pub fn copy_headers(from: &HeaderMap, to: &mut HeaderMap) {
    for (name, value) in from.iter() {
        if !is_exclude_header(name) {
            to.append(name.clone(), value.clone());
        }
    }
}
