//! Resolution of the few `$placeholder` tokens used in ready hooks and command
//! replies. This is plain substitution: unknown tokens stay in the output.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static ID_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(clientID|authorID|channelID|guildID|username)\b").unwrap()
});
static USER_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$userTag\[([^\]]*)\]").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: String,
    pub tag: String,
}

/// Values available to a template at render time.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub client: Option<UserRef>,
    pub author: Option<UserRef>,
    pub channel_id: Option<String>,
    pub guild_id: Option<String>,
}

impl Scope {
    fn lookup(&self, token: &str) -> Option<&str> {
        match token {
            "clientID" => self.client.as_ref().map(|u| u.id.as_str()),
            "authorID" => self.author.as_ref().map(|u| u.id.as_str()),
            "username" => self.author.as_ref().map(|u| u.tag.as_str()),
            "channelID" => self.channel_id.as_deref(),
            "guildID" => self.guild_id.as_deref(),
            _ => None,
        }
    }

    fn tag_of(&self, id: &str) -> Option<&str> {
        [&self.client, &self.author]
            .into_iter()
            .flatten()
            .find(|user| user.id == id)
            .map(|user| user.tag.as_str())
    }
}

pub fn render(code: &str, scope: &Scope) -> String {
    let with_ids = ID_TOKEN.replace_all(code, |caps: &Captures| {
        scope
            .lookup(&caps[1])
            .map(str::to_owned)
            .unwrap_or_else(|| caps[0].to_owned())
    });
    USER_TAG
        .replace_all(&with_ids, |caps: &Captures| {
            scope
                .tag_of(caps[1].trim())
                .map(str::to_owned)
                .unwrap_or_else(|| caps[0].to_owned())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn scope() -> Scope {
        Scope {
            client: Some(UserRef {
                id: "42".into(),
                tag: "Angel#0001".into(),
            }),
            author: Some(UserRef {
                id: "7".into(),
                tag: "someone".into(),
            }),
            channel_id: Some("100".into()),
            guild_id: None,
        }
    }

    #[test]
    fn resolves_user_tag_of_client() {
        assert_eq!(
            render("\"Бот запущен как **$userTag[$clientID]**", &scope()),
            "\"Бот запущен как **Angel#0001**"
        );
    }

    #[test]
    fn resolves_plain_ids() {
        assert_eq!(
            render("$authorID in $channelID, tag $userTag[7]", &scope()),
            "7 in 100, tag someone"
        );
    }

    #[test]
    fn leaves_unknown_tokens_alone() {
        assert_eq!(render("$pong $guildID", &scope()), "$pong $guildID");
        assert_eq!(render("$userTag[999]", &scope()), "$userTag[999]");
        assert_eq!(render("$clientIDs", &scope()), "$clientIDs");
    }

    #[test]
    fn empty_scope_keeps_template() {
        let code = "Бот запущен как $userTag[$clientID]";
        assert_eq!(render(code, &Scope::default()), code);
    }
}
