//! Integration tests for catalog loading from disk

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use lyrc_catalog::{load_catalog, parse_remotes};

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    /// Scratch directory removed on drop
    pub struct ScratchDir(pub PathBuf);

    impl ScratchDir {
        pub fn new() -> Self {
            let n = COUNTER.fetch_add(1, Ordering::SeqCst);
            let path = std::env::temp_dir().join(format!(
                "lyrc-catalog-test-{}-{}",
                std::process::id(),
                n
            ));
            fs::create_dir_all(&path).unwrap();
            Self(path)
        }

        pub fn write(&self, relative: &str, contents: &str) {
            let path = self.0.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, contents).unwrap();
        }
    }

    impl Drop for ScratchDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    pub fn remote_conf(name: &str, key: &str, code: &str) -> String {
        format!(
            "begin remote\n name {name}\n bits 16\n header 9000 4500\n one 560 1690\n zero 560 560\n ptrail 560\n gap 40000\n begin codes\n  {key} {code}\n end codes\nend remote\n"
        )
    }
}

// ============================================================================
// Directory Scanning
// ============================================================================

mod loading_tests {
    use super::helpers::*;
    use super::*;

    #[test]
    fn loads_conf_files_recursively() {
        let dir = ScratchDir::new();
        dir.write("tv.lircd.conf", &remote_conf("TV", "POWER", "0xA25D"));
        dir.write("living/amp.conf", &remote_conf("AMP", "VOLUP", "0x40BF"));
        dir.write("notes.txt", &remote_conf("IGNORED", "X", "0x0001"));

        let catalog = load_catalog(&dir.0).unwrap();

        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["AMP", "TV"]);
        assert_eq!(
            catalog.get("TV").unwrap().codes.hex("POWER").as_deref(),
            Some("0xA25D")
        );
    }

    #[test]
    fn broken_file_does_not_abort_catalog() {
        let dir = ScratchDir::new();
        dir.write("good.conf", &remote_conf("TV", "POWER", "0xA25D"));
        dir.write("broken.conf", "begin remote\n bits 16\n begin codes\n X\n");
        dir.write("binary.conf", "\u{0}\u{1}garbage");

        let catalog = load_catalog(&dir.0).unwrap();

        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains("TV"));
    }

    #[test]
    fn empty_directory_gives_empty_catalog() {
        let dir = ScratchDir::new();
        let catalog = load_catalog(&dir.0).unwrap();
        assert!(catalog.is_empty());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn parser_never_panics(text in "\\PC*") {
            let _ = parse_remotes(&text, "fuzz.conf");
        }

        #[test]
        fn keyword_lines_in_any_order_still_yield_named_remote(
            lines in prop::collection::vec(
                prop_oneof![
                    Just("bits 16"),
                    Just("header 9000 4500"),
                    Just("one 560 1690"),
                    Just("zero 560 560"),
                    Just("ptrail 560"),
                    Just("gap 40000"),
                    Just("frequency 38000"),
                    Just("bogus line here"),
                ],
                0..12
            )
        ) {
            let body = lines.join("\n");
            let text = format!("begin remote\nname R\n{body}\nend remote\n");
            let remotes = parse_remotes(&text, "prop.conf");
            prop_assert_eq!(remotes.len(), 1);
            prop_assert_eq!(remotes[0].name.as_str(), "R");
        }
    }
}
