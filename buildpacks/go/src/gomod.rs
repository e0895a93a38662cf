use fs_err as fs;
use std::io::{BufRead, BufReader};
use std::path;

/// Metadata found in a project's `go.mod`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct GoMod {
    /// Second token of the first `go` directive, e.g. `1.22`.
    pub(crate) go_version: Option<String>,
    /// Path declared by the `module` directive.
    pub(crate) module_path: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum ReadGoModError {
    #[error("Failed to read go.mod: {0}")]
    Io(#[from] std::io::Error),
}

/// Build a `GoMod` from a `go.mod` file.
///
/// # Errors
///
/// Will return an error when the file cannot be read.
pub(crate) fn read_gomod<P: AsRef<path::Path>>(gomod_path: P) -> Result<GoMod, ReadGoModError> {
    gomod_reader(fs::File::open(gomod_path.as_ref())?)
}

fn gomod_reader(buf: impl std::io::Read) -> Result<GoMod, ReadGoModError> {
    let mut gomod = GoMod::default();
    for line_result in BufReader::new(buf).lines() {
        let line = line_result?;
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("go"), Some(version)) if gomod.go_version.is_none() => {
                gomod.go_version = Some(version.to_string());
            }
            (Some("module"), Some(module_path)) if gomod.module_path.is_none() => {
                gomod.module_path = Some(module_path.trim_matches('"').to_string());
            }
            _ => (),
        }
    }
    Ok(gomod)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::formatdoc;

    #[test]
    fn gomod_file_does_not_exist() {
        let result = read_gomod(path::Path::new(""));
        assert!(result.is_err(), "Expected {result:?} to err but it did not");
    }

    #[test]
    fn module_and_go_version() {
        let go_mod = formatdoc! {"
            module github.com/example/go-online

            go 1.22

            require github.com/gorilla/mux v1.8.1
        "};
        let GoMod {
            go_version,
            module_path,
        } = gomod_reader(go_mod.as_bytes()).unwrap();
        assert_eq!(Some("1.22".to_string()), go_version);
        assert_eq!(Some("github.com/example/go-online".to_string()), module_path);
    }

    #[test]
    fn only_first_go_directive_counts() {
        let go_mod = formatdoc! {"
            module example.com/app
            go 1.12
            go 1.22
        "};
        let gomod = gomod_reader(go_mod.as_bytes()).unwrap();
        assert_eq!(Some("1.12".to_string()), gomod.go_version);
    }

    #[test]
    fn toolchain_and_comments_are_ignored() {
        let go_mod = formatdoc! {r#"
            // go 1.10 is what we used to use
            module "example.com/quoted"
            toolchain go1.22.7
            gopher 1.0
        "#};
        let gomod = gomod_reader(go_mod.as_bytes()).unwrap();
        assert_eq!(None, gomod.go_version);
        assert_eq!(Some("example.com/quoted".to_string()), gomod.module_path);
    }

    #[test]
    fn empty_file() {
        let gomod = gomod_reader(String::new().as_bytes()).unwrap();
        assert_eq!(GoMod::default(), gomod);
    }
}
