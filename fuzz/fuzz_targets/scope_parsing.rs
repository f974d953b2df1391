#![no_main]

use ferrous_ioc::Scope;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(name) = std::str::from_utf8(data) {
        let scope = Scope::parse(name);
        match &scope {
            Scope::Singleton => assert!(name.is_empty() || name == "singleton"),
            Scope::Prototype => assert_eq!(name, "prototype"),
            Scope::Other(other) => assert_eq!(other, name),
        }
        // Parsing the printed form is stable
        assert_eq!(Scope::parse(scope.as_str()), scope);
    }
});
