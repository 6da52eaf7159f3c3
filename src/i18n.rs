// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持中文（默认）和英文
// 提示消息中的数值统一经 format_number 输出
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（"zh-CN" 或 "en"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use seafood_trace::i18n::t;
/// let msg = t("common.success");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数）
///
/// # 示例
/// ```no_run
/// use seafood_trace::i18n::t_with_args;
/// let msg = t_with_args("lot.created", &[("lot_number", "L2405171230"), ("count", "2"), ("weight", "15.5")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

/// 数值显示: 最多保留 decimals 位小数，去掉末尾多余的 0
///
/// 例: format_number(15.50, 2) -> "15.5", format_number(80.0, 1) -> "80"
pub fn format_number(value: f64, decimals: usize) -> String {
    let mut text = format!("{:.*}", decimals, value);
    if text.contains('.') {
        while text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // rust-i18n 的 locale 为全局状态，且 Rust 测试默认并行执行；
    // 为避免测试互相干扰，这里对 i18n 相关测试串行化。
    static LOCALE_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_locale() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        // 显式设置为默认语言
        set_locale("zh-CN");
        assert_eq!(current_locale(), "zh-CN");
    }

    #[test]
    fn test_set_locale() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        // 测试切换语言
        set_locale("zh-CN");
        assert_eq!(current_locale(), "zh-CN");

        set_locale("en");
        assert_eq!(current_locale(), "en");

        // 恢复默认语言
        set_locale("zh-CN");
    }

    #[test]
    fn test_translate_simple() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        // 测试中文翻译
        set_locale("zh-CN");
        let msg = t("common.success");
        assert_eq!(msg, "操作成功");

        // 测试英文翻译
        set_locale("en");
        let msg = t("common.success");
        assert_eq!(msg, "Operation successful");

        // 恢复默认语言
        set_locale("zh-CN");
    }

    #[test]
    fn test_translate_with_args() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("zh-CN");
        let msg = t_with_args("depuration.started", &[("lot_number", "L2405171230"), ("tank", "T-03")]);
        assert!(msg.contains("L2405171230"));
        assert!(msg.contains("T-03"));
        assert!(msg.contains("开始净化"));

        set_locale("en");
        let msg = t_with_args("depuration.started", &[("lot_number", "L2405171230"), ("tank", "T-03")]);
        assert_eq!(msg, "Depuration of lot L2405171230 started in tank T-03");

        // 恢复默认语言
        set_locale("zh-CN");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(15.5, 2), "15.5");
        assert_eq!(format_number(80.0, 1), "80");
        assert_eq!(format_number(0.333333, 2), "0.33");
        assert_eq!(format_number(-0.001, 2), "0");
    }

    #[test]
    fn test_missing_placeholder_left_untouched() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        let msg = t_with_args("qc.failed", &[("lot_number", "L1")]);
        assert!(msg.contains("%{count}"));
        set_locale("zh-CN");
    }
}
