//! Splitting a submitted command list into show commands and one
//! configuration block.

/// Session-control keywords a user may type that are never sent on their own.
pub const MODE_KEYWORDS: [&str; 3] = ["enable", "end", "exit"];

/// A classified command batch.
///
/// Show commands run first, one by one, then the configuration block runs
/// inside configuration mode. Order within each part is the input order;
/// interleaving between the parts is not kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandBatch {
    /// `show ...` commands.
    pub show: Vec<String>,

    /// Lines recognized and dropped: mode keywords, `configure terminal`
    /// and save commands.
    pub filtered: Vec<String>,

    /// Lines for the configuration block.
    pub config: Vec<String>,

    /// The save commands among `filtered`. Saving is decided by the
    /// caller's save flag alone; these are only reported.
    pub dropped_saves: Vec<String>,
}

impl CommandBatch {
    /// Classify free-form input.
    ///
    /// A command is a show command iff its trimmed text starts with `show `
    /// or is exactly `enable`, `end` or `exit`; the three keywords are then
    /// dropped. Everything else joins the configuration block, except that
    /// `configure terminal` is implied by the block and save commands are
    /// dropped.
    pub fn classify<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut batch = Self::default();
        for command in commands {
            let command = command.as_ref().trim();
            if command.is_empty() {
                continue;
            }
            if command.starts_with("show ") {
                batch.show.push(command.to_string());
            } else if MODE_KEYWORDS.contains(&command) {
                batch.filtered.push(command.to_string());
            } else {
                batch.push_config_line(command);
            }
        }
        batch
    }

    /// A configuration script as produced by the template builders, run as
    /// one block. `exit` and `end` lines are kept: inside the block they
    /// move between configuration sub-modes.
    pub fn config_script<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut batch = Self::default();
        for command in commands {
            let command = command.as_ref().trim();
            if !command.is_empty() {
                batch.push_config_line(command);
            }
        }
        batch
    }

    fn push_config_line(&mut self, command: &str) {
        if is_config_entry(command) {
            self.filtered.push(command.to_string());
        } else if is_save_command(command) {
            self.filtered.push(command.to_string());
            self.dropped_saves.push(command.to_string());
        } else {
            self.config.push(command.to_string());
        }
    }

    /// No show or configuration line remains.
    pub fn is_empty(&self) -> bool {
        self.show.is_empty() && self.config.is_empty()
    }
}

/// `word` is an abbreviation of `full` at least `min` characters long.
fn abbreviates(word: &str, full: &str, min: usize) -> bool {
    word.len() >= min && full.starts_with(word)
}

/// `configure terminal` and its abbreviations (`conf t`).
fn is_config_entry(command: &str) -> bool {
    let lower = command.to_ascii_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    matches!(
        words.as_slice(),
        [configure, terminal] if abbreviates(configure, "configure", 4) && abbreviates(terminal, "terminal", 1)
    )
}

/// `write memory`, `write`, `wr`, `copy running-config startup-config`.
fn is_save_command(command: &str) -> bool {
    let lower = command.to_ascii_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    match words.as_slice() {
        [write] => abbreviates(write, "write", 2),
        [write, memory] => abbreviates(write, "write", 2) && abbreviates(memory, "memory", 3),
        [copy, running, startup] => {
            *copy == "copy"
                && abbreviates(running, "running-config", 3)
                && abbreviates(startup, "startup-config", 5)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_commands_run_first() {
        let batch = CommandBatch::classify([
            "show ip interface brief",
            "interface Gi0/1",
            "no shutdown",
        ]);
        assert_eq!(batch.show, vec!["show ip interface brief"]);
        assert_eq!(batch.config, vec!["interface Gi0/1", "no shutdown"]);
        assert!(batch.dropped_saves.is_empty());
    }

    #[test]
    fn test_interleaving_is_not_preserved() {
        let batch = CommandBatch::classify([
            "interface Gi0/1",
            "show version",
            "  no shutdown ",
            "show clock",
        ]);
        assert_eq!(batch.show, vec!["show version", "show clock"]);
        assert_eq!(batch.config, vec!["interface Gi0/1", "no shutdown"]);
    }

    #[test]
    fn test_mode_keywords_are_filtered() {
        let batch = CommandBatch::classify(["enable", "conf t", "hostname R2", "end", "exit", ""]);
        assert!(batch.show.is_empty());
        assert_eq!(batch.config, vec!["hostname R2"]);
        assert_eq!(batch.filtered, vec!["enable", "conf t", "end", "exit"]);
    }

    #[test]
    fn test_exact_match_rules() {
        // Only an exact keyword or the `show ` prefix lands in the show part.
        let batch = CommandBatch::classify(["show", "exit-address-family", "enable secret x"]);
        assert!(batch.show.is_empty());
        assert_eq!(
            batch.config,
            vec!["show", "exit-address-family", "enable secret x"]
        );
    }

    #[test]
    fn test_save_command_is_dropped() {
        let batch = CommandBatch::classify(["hostname R2", "write memory"]);
        assert_eq!(batch.config, vec!["hostname R2"]);
        assert_eq!(batch.filtered, vec!["write memory"]);
        assert_eq!(batch.dropped_saves, vec!["write memory"]);

        for save in ["wr", "write", "WR MEM", "copy run start"] {
            assert!(is_save_command(save), "{save}");
        }
        assert!(!is_save_command("w"));
        assert!(!is_save_command("write erase"));
    }

    #[test]
    fn test_config_script_keeps_exits() {
        let batch = CommandBatch::config_script([
            "configure terminal",
            "vlan 10",
            "exit",
            "interface range Fa0/1-5",
            "switchport mode access",
            "switchport access vlan 10",
            "exit",
            "exit",
            "write memory",
        ]);
        assert_eq!(
            batch.config,
            vec![
                "vlan 10",
                "exit",
                "interface range Fa0/1-5",
                "switchport mode access",
                "switchport access vlan 10",
                "exit",
                "exit",
            ]
        );
        assert_eq!(batch.filtered, vec!["configure terminal", "write memory"]);
        assert_eq!(batch.dropped_saves, vec!["write memory"]);
        assert!(batch.show.is_empty());
    }

    #[test]
    fn test_config_entry_abbreviations() {
        for entry in ["conf t", "configure terminal", "CONFIG T", "conf term"] {
            assert!(is_config_entry(entry), "{entry}");
        }
        assert!(!is_config_entry("con t"));
        assert!(!is_config_entry("configure replace flash:cfg"));
    }

    #[test]
    fn test_is_empty() {
        assert!(CommandBatch::classify(["enable", "end"]).is_empty());
        assert!(CommandBatch::classify(["conf t", "wr"]).is_empty());
        assert!(!CommandBatch::classify(["hostname R2"]).is_empty());
    }
}
