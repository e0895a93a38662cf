use libcnb::Env;

/// Buildpack configuration found in the user-provided build environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct BuildpackConfig {
    /// `GOVERSION`: replaces whatever version the vendor tool declares.
    pub(crate) go_version_override: Option<String>,
    /// `GOPACKAGENAME`: import path for apps that don't declare one.
    pub(crate) package_name: Option<String>,
    /// `GO_INSTALL_PACKAGE_SPEC`: whitespace separated package list.
    pub(crate) install_package_spec: Option<Vec<String>>,
    /// `GO_LINKER_SYMBOL` and `GO_LINKER_VALUE`, only when both are set.
    pub(crate) linker: Option<Linker>,
    /// `GO15VENDOREXPERIMENT`, verbatim when non-empty.
    pub(crate) vendor_experiment: Option<String>,
    /// `GO_SETUP_GOPATH_IN_IMAGE=true`
    pub(crate) gopath_in_image: bool,
    /// `GO_INSTALL_TOOLS_IN_IMAGE=true`
    pub(crate) tools_in_image: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Linker {
    pub(crate) symbol: String,
    pub(crate) value: String,
}

impl BuildpackConfig {
    pub(crate) fn from_env(env: &Env) -> Self {
        let var = |key: &str| env.get_string_lossy(key).filter(|value| !value.is_empty());

        BuildpackConfig {
            go_version_override: var("GOVERSION"),
            package_name: var("GOPACKAGENAME"),
            install_package_spec: var("GO_INSTALL_PACKAGE_SPEC")
                .map(|spec| spec.split_whitespace().map(String::from).collect::<Vec<_>>())
                .filter(|packages| !packages.is_empty()),
            linker: var("GO_LINKER_SYMBOL")
                .zip(var("GO_LINKER_VALUE"))
                .map(|(symbol, value)| Linker { symbol, value }),
            vendor_experiment: var("GO15VENDOREXPERIMENT"),
            gopath_in_image: env.get_string_lossy("GO_SETUP_GOPATH_IN_IMAGE").as_deref()
                == Some("true"),
            tools_in_image: env.get_string_lossy("GO_INSTALL_TOOLS_IN_IMAGE").as_deref()
                == Some("true"),
        }
    }
}
