use crate::CommandEnv;

/// Structured engine invocation.
///
/// The command is kept as program + argument vector + environment overlay.
/// It is flattened into a shell string only for the run log and, when a
/// [`prelude`](CommandSpec::prelude) has to run first, for `sh -c`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute (e.g. `"snakemake"`).
    pub program: String,
    /// Arguments in order.
    pub args: Vec<String>,
    /// Variables set on the child only.
    pub env: CommandEnv,
    /// Shell snippet that prepares the environment before the program starts
    /// (e.g. `module load ...`).
    pub prelude: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: CommandEnv::new(),
            prelude: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push(key, value);
        self
    }

    pub fn with_prelude(mut self, prelude: impl Into<String>) -> Self {
        self.prelude = Some(prelude.into());
        self
    }

    /// `program args...`, each word shell-quoted.
    pub fn argv_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|w| shell_quote(w))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Script handed to `sh -c` when a prelude is present.
    ///
    /// `exec` replaces the shell so the supervised pid is the engine itself.
    pub fn shell_script(&self) -> Option<String> {
        self.prelude
            .as_ref()
            .map(|p| format!("{p} && exec {}", self.argv_line()))
    }

    /// Full invocation as a single shell line, environment exports included.
    pub fn to_shell_string(&self) -> String {
        let mut parts: Vec<String> = self
            .env
            .effective()
            .into_iter()
            .map(|(k, v)| format!("export {k}={} &&", shell_quote(v)))
            .collect();
        if let Some(prelude) = &self.prelude {
            parts.push(format!("{prelude} &&"));
        }
        parts.push(self.argv_line());
        parts.join(" ")
    }
}

/// POSIX single-quote `word` unless it only holds characters the shell leaves alone.
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
