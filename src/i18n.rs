// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持英文（默认）和中文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// 语言按调用传入，不修改全局 locale
// ==========================================

fn fill_args(mut message: String, args: &[(&str, &str)]) -> String {
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        message = message.replace(&placeholder, v);
    }
    message
}

/// 按指定语言翻译（带参数）
///
/// # 参数
/// - locale: 语言代码（"en" 或 "zh-CN"），未知语言回退到 en
/// - key: 消息键
/// - args: 占位符 `%{name}` 的取值
///
/// # 示例
/// ```no_run
/// use personal_data_import::i18n::t_in;
/// let msg = t_in("zh-CN", "import.parse_failed", &[("error", "bad json")]);
/// ```
pub fn t_in(locale: &str, key: &str, args: &[(&str, &str)]) -> String {
    fill_args(rust_i18n::t!(key, locale = locale).to_string(), args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_with_args() {
        let msg = t_in(
            "en",
            "import.summary",
            &[("provider", "PgeImporter"), ("processed", "3"), ("errors", "1")],
        );
        assert_eq!(msg, "Type: PgeImporter. Processed: 3. Errors: 1");
    }

    #[test]
    fn test_translate_in_explicit_locale() {
        assert_eq!(t_in("en", "import.unknown_format", &[]), "Unknown file format.");
        assert_eq!(t_in("zh-CN", "import.empty_file", &[]), "文件为空或无法解析。");
        assert_eq!(
            t_in("en", "import.empty_file", &[]),
            "File is empty or could not be parsed."
        );
    }

    #[test]
    fn test_unknown_locale_falls_back_to_english() {
        assert_eq!(t_in("fr", "import.unknown_format", &[]), "Unknown file format.");
    }
}
