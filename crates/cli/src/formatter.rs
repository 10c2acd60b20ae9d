// crates/cli/src/formatter.rs
use clap::Command;

const HELP_TEMPLATE: &str = "\
{name} {version}
{about-with-newline}
Usage: {usage}

{all-args}{after-help}";

const AFTER_HELP: &str = "\
Each applied operation prints one line:
  + create    U update    R rename    - delete    T trash    L symlink

Exit status:
  0 completed, 1 input error, 2 interrupted by error, 3 connection error,
  4 error limit reached, 5 some operations failed, 130 interrupted";

pub fn apply(cmd: Command) -> Command {
    cmd.term_width(80)
        .help_template(HELP_TEMPLATE)
        .after_help(AFTER_HELP)
}

#[cfg(test)]
mod tests {
    use crate::options::cli_command;

    #[test]
    fn help_lists_operation_markers_and_exit_codes() {
        let help = cli_command().render_help().to_string();
        assert!(help.starts_with("rensync "), "{help}");
        assert!(help.contains("Usage: rensync"), "{help}");
        assert!(help.contains("R rename"), "{help}");
        assert!(help.contains("130 interrupted"), "{help}");
        assert!(help.contains("Renames:"), "{help}");
    }
}
