use serde::{Deserialize, Serialize};

/// Interaction type for slash commands.
pub const APPLICATION_COMMAND: u8 = 2;

/// Option type for string arguments.
pub const OPTION_STRING: u8 = 3;

/// The subset of an `INTERACTION_CREATE` payload the bot reads.
#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub application_id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub token: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    /// Present for invocations inside a guild.
    #[serde(default)]
    pub member: Option<Member>,
    /// Present for invocations in a DM.
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub data: Option<CommandData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

/// Who invoked a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub role_ids: Vec<String>,
}

/// What is needed to answer an interaction after the event is gone.
#[derive(Clone, PartialEq, Eq)]
pub struct InteractionRef {
    pub id: String,
    pub application_id: String,
    pub token: String,
}

impl std::fmt::Debug for InteractionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionRef")
            .field("id", &self.id)
            .field("application_id", &self.application_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Interaction {
    pub fn is_command(&self, name: &str) -> bool {
        self.kind == APPLICATION_COMMAND && self.data.as_ref().is_some_and(|d| d.name == name)
    }

    /// The invoking user and, inside a guild, their role ids.
    pub fn caller(&self) -> Option<Caller> {
        if let Some(member) = &self.member {
            let user = member.user.as_ref().or(self.user.as_ref())?;
            return Some(Caller {
                user_id: user.id.clone(),
                role_ids: member.roles.clone(),
            });
        }
        self.user.as_ref().map(|user| Caller {
            user_id: user.id.clone(),
            role_ids: Vec::new(),
        })
    }

    /// A string option's value; blank strings count as absent.
    pub fn string_option(&self, name: &str) -> Option<String> {
        self.data
            .as_ref()?
            .options
            .iter()
            .find(|option| option.name == name)
            .and_then(|option| option.value.as_ref())
            .and_then(|value| value.as_str())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    pub fn reference(&self) -> InteractionRef {
        InteractionRef {
            id: self.id.clone(),
            application_id: self.application_id.clone(),
            token: self.token.clone(),
        }
    }
}

/// An application command as sent to the bulk-overwrite endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOptionSpec>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommandOptionSpec {
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: String,
    pub description: String,
    pub required: bool,
}
