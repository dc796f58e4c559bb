//! URL 判定与规范化

/// 首条消息是否像 URL：含点号且长度超过 4 个字符
pub fn looks_like_url(message: &str) -> bool {
    let message = message.trim();
    message.contains('.') && message.chars().count() > 4
}

/// 补全协议头：没有 http:// 或 https:// 时加上 https://
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_url() {
        assert!(looks_like_url("example.com"));
        assert!(looks_like_url("  https://loja.com.br/produtos "));
        assert!(!looks_like_url("olá"));
        assert!(!looks_like_url("a.b"));
        assert!(!looks_like_url("sem ponto nenhum"));
    }

    #[test]
    fn test_normalize_url_adds_https() {
        assert_eq!(normalize_url("example.com"), "https://example.com");
        assert_eq!(normalize_url(" example.com/a "), "https://example.com/a");
    }

    #[test]
    fn test_normalize_url_keeps_existing_scheme() {
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
    }
}
