use campus_types::{GroupId, UserId};

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Forum,
    Group(GroupId),
    Groups,
    Create { name: String, members: Vec<UserId> },
    Who,
    Logout,
    Quit,
    Say(String),
    Invalid(String),
}

pub const HELP: &str = "\
commands:
  /forum                      open the department forum
  /group <id>                 open a group
  /groups                     list your groups
  /create <name> <id,id,...>  create a group and open it
  /who                        list members of the open channel
  /logout                     forget the saved session and quit
  /quit                       exit
anything else is sent to the open channel
others' typing is shown; this terminal does not announce yours";

impl Input {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Input::Say(line.to_string());
        };

        let (command, args) = match rest.split_once(char::is_whitespace) {
            Some((command, args)) => (command, args.trim()),
            None => (rest, ""),
        };

        match command {
            "forum" => Input::Forum,
            "group" if !args.is_empty() => Input::Group(GroupId::new(args)),
            "group" => Input::Invalid("usage: /group <id>".into()),
            "groups" => Input::Groups,
            "create" => parse_create(args),
            "who" => Input::Who,
            "logout" => Input::Logout,
            "quit" | "exit" => Input::Quit,
            _ => Input::Invalid(HELP.into()),
        }
    }
}

/// The member list is the last whitespace-separated word; everything
/// before it is the group name.
fn parse_create(args: &str) -> Input {
    let Some((name, ids)) = args.rsplit_once(char::is_whitespace) else {
        return Input::Invalid("usage: /create <name> <id,id,...>".into());
    };
    let members: Vec<UserId> = ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(UserId::new)
        .collect();
    let name = name.trim();
    if name.is_empty() || members.is_empty() {
        return Input::Invalid("usage: /create <name> <id,id,...>".into());
    }
    Input::Create {
        name: name.to_string(),
        members,
    }
}
