#![no_main]
use libfuzzer_sys::fuzz_target;
use svgguard::xml::{Config, Parser};

fuzz_target!(|data: &[u8]| {
    let _ = Parser::with_config(data, Config::new(64, 1024 * 1024)).parse();
});
