/// One line of REPL input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Say(String),
    New,
    List,
    /// 1-based index into the listing, or a thread id
    Switch(String),
    Rename(String),
    Delete(Option<String>),
    History,
    Help,
    Quit,
    Empty,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Command::Empty);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Command::Say(line.to_string()));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        match (name, arg) {
            ("new", _) => Ok(Command::New),
            ("list" | "ls", _) => Ok(Command::List),
            ("switch" | "s", "") => Err("usage: /switch <number|id>".to_string()),
            ("switch" | "s", target) => Ok(Command::Switch(target.to_string())),
            ("rename", "") => Err("usage: /rename <title>".to_string()),
            ("rename", title) => Ok(Command::Rename(title.to_string())),
            ("delete" | "rm", "") => Ok(Command::Delete(None)),
            ("delete" | "rm", target) => Ok(Command::Delete(Some(target.to_string()))),
            ("history" | "h", _) => Ok(Command::History),
            ("help" | "?", _) => Ok(Command::Help),
            ("quit" | "exit" | "q", _) => Ok(Command::Quit),
            (other, _) => Err(format!("unknown command '/{}', try /help", other)),
        }
    }
}

pub const HELP: &str = "\
Type a message and press enter to chat. Commands:
  /new               start a new thread
  /list              list threads (newest first)
  /switch <n|id>     select a thread by list number or id
  /rename <title>    rename the selected thread
  /delete [n|id]     delete a thread (default: the selected one)
  /history           show the selected thread's messages
  /help              show this help
  /quit              exit";
