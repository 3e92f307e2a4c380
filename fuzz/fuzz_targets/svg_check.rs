#![no_main]
use libfuzzer_sys::fuzz_target;
use svgguard::{Checker, PolicySanitizer, ScanConfig, Verdict};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let sanitizer = PolicySanitizer::default();
        let checker = Checker::new(&sanitizer).with_config(ScanConfig::sequential());
        // a replacement that cannot be parsed back would brick the package
        if let Verdict::Dirty { markup } = checker.check_markup(s) {
            assert!(!matches!(checker.check_markup(&markup), Verdict::Unparseable(_)));
        }
    }
});
