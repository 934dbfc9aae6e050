/// Directories searched for external commands, in order of precedence.
pub const DEFAULT_SEARCH_PATH: [&str; 4] = ["/bin/", "/usr/bin/", "/usr/local/bin/", "./"];

/// Ordered list of directory prefixes used to resolve command names.
///
/// Built once at start-up and never mutated afterwards. Each prefix is prepended to
/// the command name verbatim, so prefixes are expected to end with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPath {
    prefixes: Vec<String>,
}

impl SearchPath {
    /// Build a search path from explicit prefixes, highest precedence first.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Iterate over the prefixes in search order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.prefixes.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

impl Default for SearchPath {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_PATH)
    }
}

/// State shared between the interpreter loop and the commands it runs.
///
/// The working directory is deliberately not stored here: `cd` changes the process
/// working directory, which every later child inherits.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Where external commands are looked up.
    pub search_path: SearchPath,
    /// Set by `exit`/`quit`; the loop stops once the current line is done.
    pub should_exit: bool,
}

impl Environment {
    pub fn new(search_path: SearchPath) -> Self {
        Self {
            search_path,
            should_exit: false,
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(SearchPath::default())
    }
}
