//! `roster members` — group members that already hold the role.

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use roster_sync::{pipeline, GroupMember};

use super::{runtime, CommonArgs};

/// Arguments for `roster members`.
#[derive(Args, Debug, Clone)]
pub struct MembersArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Tabled)]
struct MemberRow {
    #[tabled(rename = "account id")]
    account_id: String,
    #[tabled(rename = "username")]
    username: String,
    #[tabled(rename = "display name")]
    display_name: String,
    #[tabled(rename = "nick")]
    nick: String,
}

impl From<&GroupMember> for MemberRow {
    fn from(m: &GroupMember) -> Self {
        Self {
            account_id: m.account_id.to_string(),
            username: m.username.clone(),
            display_name: m.display_name.clone().unwrap_or_default(),
            nick: m.nick.clone().unwrap_or_default(),
        }
    }
}

impl MembersArgs {
    pub fn run(self) -> Result<()> {
        let config = self.common.prepare()?;
        let members = runtime()?
            .block_on(pipeline::members(&config))
            .context("failed to list group members")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&members).context("failed to serialize members")?
            );
            return Ok(());
        }

        if members.is_empty() {
            println!("No members hold role {}.", config.platform.role_id);
            return Ok(());
        }
        let mut table = Table::new(members.iter().map(MemberRow::from));
        table.with(Style::rounded());
        println!("{table}");
        println!("{} member(s) hold role {}", members.len(), config.platform.role_id);
        Ok(())
    }
}
