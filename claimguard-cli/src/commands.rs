//! Subcommands shared by one-shot mode and the console

use anyhow::{anyhow, Result};
use clap::{Subcommand, ValueEnum};
use claimguard_core::config::Config;
use claimguard_core::core_region::{
    AccessDecision, ActionResponse, BlockAction, ClaimOutcome, FailureReason, PlayerId,
    ProtectionContext, RegionId, RegionInfo, SharedRegion, WorldCoordinate, WorldId,
};
use claimguard_core::messages::{MessageCatalog, MessageKey};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database and optionally write a default config file
    Init {
        #[arg(long, value_name = "PATH")]
        write_config: Option<PathBuf>,
    },

    /// Claim the block at X Y Z
    #[command(allow_negative_numbers = true)]
    Claim {
        #[arg(long = "as", value_name = "PLAYER")]
        player: String,
        #[arg(long)]
        world: String,
        x: i32,
        y: i32,
        z: i32,
        /// Limit tiers the player holds (repeatable)
        #[arg(long = "tier")]
        tiers: Vec<String>,
    },

    /// List claims in creation order
    List {
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Show one claim
    Info {
        region: String,
        #[arg(long)]
        json: bool,
    },

    /// Rename a claim (owner only)
    Rename {
        #[arg(long = "as", value_name = "PLAYER")]
        player: String,
        region: String,
        name: String,
    },

    /// Invite a player into a claim
    Invite {
        #[arg(long = "as", value_name = "PLAYER")]
        player: String,
        region: String,
        target: String,
    },

    /// Accept an invitation; the latest one when no claim is named
    Accept {
        #[arg(long = "as", value_name = "PLAYER")]
        player: String,
        region: Option<String>,
    },

    /// Remove a player from a claim
    Kick {
        #[arg(long = "as", value_name = "PLAYER")]
        player: String,
        region: String,
        target: String,
    },

    /// Make a member an officer (owner only)
    Promote {
        #[arg(long = "as", value_name = "PLAYER")]
        player: String,
        region: String,
        target: String,
    },

    /// Make an officer a member (owner only)
    Demote {
        #[arg(long = "as", value_name = "PLAYER")]
        player: String,
        region: String,
        target: String,
    },

    /// Leave a claim you belong to
    Leave {
        #[arg(long = "as", value_name = "PLAYER")]
        player: String,
        region: String,
    },

    /// Delete a claim (owner, or anyone with --bypass)
    Delete {
        #[arg(long = "as", value_name = "PLAYER")]
        player: String,
        region: String,
        #[arg(long)]
        bypass: bool,
    },

    /// Check whether a player may act on the block at X Y Z
    #[command(allow_negative_numbers = true)]
    Check {
        #[arg(long = "as", value_name = "PLAYER")]
        player: String,
        #[arg(long)]
        world: String,
        x: i32,
        y: i32,
        z: i32,
        #[arg(long, value_enum, default_value_t = ActionArg::Break)]
        action: ActionArg,
        #[arg(long)]
        bypass: bool,
    },

    /// Read commands from stdin with autosave running
    Console,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ActionArg {
    Interact,
    Place,
    Break,
}

impl From<ActionArg> for BlockAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Interact => BlockAction::Interact,
            ActionArg::Place => BlockAction::Place,
            ActionArg::Break => BlockAction::Break,
        }
    }
}

/// What a command produced
#[derive(Debug)]
pub enum Output {
    Done(Vec<String>),
    Refused(String),
}

impl Output {
    pub fn print(&self) {
        match self {
            Output::Done(lines) => {
                for line in lines {
                    println!("{}", line);
                }
            }
            Output::Refused(message) => eprintln!("{}", message),
        }
    }
}

fn respond(catalog: &MessageCatalog, response: ActionResponse, success: MessageKey, args: &[(&str, &str)]) -> Output {
    let message = catalog.respond(&response, success, args);
    if response.is_successful() {
        Output::Done(vec![message])
    } else {
        Output::Refused(message)
    }
}

fn refused(catalog: &MessageCatalog, reason: FailureReason) -> Output {
    respond(catalog, ActionResponse::failed(reason), MessageKey::FailedNotFound, &[])
}

fn describe(region: &SharedRegion) -> Result<(RegionId, String)> {
    let region = region.read().map_err(|_| anyhow!("region lock poisoned"))?;
    Ok((region.id, region.name.clone()))
}

fn info_lines(catalog: &MessageCatalog, info: &RegionInfo) -> Vec<String> {
    let join = |players: &[PlayerId]| {
        if players.is_empty() {
            "-".to_string()
        } else {
            players.iter().map(PlayerId::as_str).collect::<Vec<_>>().join(", ")
        }
    };
    let anchor = &info.volume.center;

    vec![
        catalog.render(
            MessageKey::InfoHeader,
            &[("name", &info.name), ("id", &info.id.to_string())],
        ),
        catalog.render(MessageKey::InfoOwner, &[("owner", info.owner.as_str())]),
        catalog.render(MessageKey::InfoOfficers, &[("officers", &join(&info.officers))]),
        catalog.render(MessageKey::InfoMembers, &[("members", &join(&info.members))]),
        catalog.render(MessageKey::InfoPending, &[("pending", &join(&info.pending))]),
        catalog.render(
            MessageKey::InfoVolume,
            &[
                ("x", &anchor.x.to_string()),
                ("y", &anchor.y.to_string()),
                ("z", &anchor.z.to_string()),
                ("world", anchor.world.as_str()),
                ("radius", &info.volume.radius.to_string()),
            ],
        ),
    ]
}

/// Staff operations that take (actor, region, target)
fn staff_command(
    ctx: &ProtectionContext,
    catalog: &MessageCatalog,
    region: &str,
    target: &str,
    success: MessageKey,
    op: impl FnOnce(&RegionId, &PlayerId) -> claimguard_core::core_region::RegionResult<ActionResponse>,
) -> Result<Output> {
    let Some(shared) = ctx.find(region) else {
        return Ok(refused(catalog, FailureReason::NotFound));
    };
    let (id, name) = describe(&shared)?;
    let response = op(&id, &PlayerId::new(target))?;
    Ok(respond(catalog, response, success, &[("player", target), ("region", &name)]))
}

pub fn execute(
    ctx: &ProtectionContext,
    catalog: &MessageCatalog,
    config: &Config,
    command: Command,
) -> Result<Output> {
    match command {
        Command::Init { write_config } => {
            let mut lines = vec![format!(
                "Database ready at {}",
                config.storage.database_path.display()
            )];
            if let Some(path) = write_config {
                config.save_to_file(&path)?;
                lines.push(format!("Wrote configuration to {}", path.display()));
            }
            Ok(Output::Done(lines))
        }

        Command::Claim { player, world, x, y, z, tiers } => {
            let coordinate = WorldCoordinate::new(WorldId::new(world), x, y, z);
            match ctx.claim(&PlayerId::new(player), coordinate, tiers.as_slice())? {
                ClaimOutcome::Created(region) => {
                    let (_, name) = describe(&region)?;
                    Ok(Output::Done(vec![
                        catalog.render(MessageKey::ClaimCreated, &[("region", &name)]),
                    ]))
                }
                ClaimOutcome::Refused(response) => {
                    Ok(respond(catalog, response, MessageKey::ClaimCreated, &[]))
                }
            }
        }

        Command::List { owner, json } => {
            let regions = match owner {
                Some(owner) => ctx.manager().regions_owned_by(&PlayerId::new(owner)),
                None => ctx.manager().regions(),
            };
            let infos = regions
                .iter()
                .map(|r| {
                    r.read()
                        .map(|region| region.info())
                        .map_err(|_| anyhow!("region lock poisoned"))
                })
                .collect::<Result<Vec<_>>>()?;

            if json {
                return Ok(Output::Done(vec![serde_json::to_string_pretty(&infos)?]));
            }
            Ok(Output::Done(
                infos
                    .iter()
                    .map(|info| {
                        let anchor = &info.volume.center;
                        format!(
                            "{}\t{}\t{} {} {} {}\tradius {}",
                            info.name, info.owner, anchor.world, anchor.x, anchor.y, anchor.z, info.volume.radius
                        )
                    })
                    .collect(),
            ))
        }

        Command::Info { region, json } => {
            let Some(info) = ctx.find(&region).and_then(|shared| {
                let id = shared.read().ok()?.id;
                ctx.info(&id)
            }) else {
                return Ok(refused(catalog, FailureReason::NotFound));
            };

            if json {
                return Ok(Output::Done(vec![serde_json::to_string_pretty(&info)?]));
            }
            Ok(Output::Done(info_lines(catalog, &info)))
        }

        Command::Rename { player, region, name } => {
            let Some(shared) = ctx.find(&region) else {
                return Ok(refused(catalog, FailureReason::NotFound));
            };
            let (id, _) = describe(&shared)?;
            let response = ctx.rename(&PlayerId::new(player), &id, &name)?;
            Ok(respond(catalog, response, MessageKey::Renamed, &[("name", &name)]))
        }

        Command::Invite { player, region, target } => {
            let actor = PlayerId::new(player);
            staff_command(ctx, catalog, &region, &target, MessageKey::Invited, |id, target| {
                ctx.invite(&actor, id, target)
            })
        }

        Command::Accept { player, region } => {
            let region_id = match region {
                Some(region) => match ctx.find(&region) {
                    Some(shared) => Some(describe(&shared)?.0),
                    None => return Ok(refused(catalog, FailureReason::NotFound)),
                },
                None => None,
            };

            let player = PlayerId::new(player);
            let target = match region_id {
                Some(id) => Some(id),
                None => ctx.pending_invitations(&player)?.last().map(|inv| inv.region),
            };
            let response = ctx.accept(&player, region_id.as_ref())?;
            let name = target
                .and_then(|id| ctx.manager().region(&id))
                .map(|shared| describe(&shared))
                .transpose()?
                .map(|(_, name)| name)
                .unwrap_or_default();

            Ok(respond(catalog, response, MessageKey::Accepted, &[("region", &name)]))
        }

        Command::Kick { player, region, target } => {
            let actor = PlayerId::new(player);
            staff_command(ctx, catalog, &region, &target, MessageKey::Kicked, |id, target| {
                ctx.kick(&actor, id, target)
            })
        }

        Command::Promote { player, region, target } => {
            let actor = PlayerId::new(player);
            staff_command(ctx, catalog, &region, &target, MessageKey::Promoted, |id, target| {
                ctx.promote(&actor, id, target)
            })
        }

        Command::Demote { player, region, target } => {
            let actor = PlayerId::new(player);
            staff_command(ctx, catalog, &region, &target, MessageKey::Demoted, |id, target| {
                ctx.demote(&actor, id, target)
            })
        }

        Command::Leave { player, region } => {
            let Some(shared) = ctx.find(&region) else {
                return Ok(refused(catalog, FailureReason::NotFound));
            };
            let (id, name) = describe(&shared)?;
            let response = ctx.leave(&PlayerId::new(player), &id)?;
            Ok(respond(catalog, response, MessageKey::Left, &[("region", &name)]))
        }

        Command::Delete { player, region, bypass } => {
            let Some(shared) = ctx.find(&region) else {
                return Ok(refused(catalog, FailureReason::NotFound));
            };
            let (id, name) = describe(&shared)?;
            let response = ctx.delete(&PlayerId::new(player), &id, bypass)?;
            Ok(respond(catalog, response, MessageKey::Deleted, &[("region", &name)]))
        }

        Command::Check { player, world, x, y, z, action, bypass } => {
            let coordinate = WorldCoordinate::new(WorldId::new(world), x, y, z);
            match ctx.check_block_action(&PlayerId::new(player), &coordinate, action.into(), bypass) {
                AccessDecision::Allowed => Ok(Output::Done(vec!["allowed".to_string()])),
                AccessDecision::Unclaimed => Ok(Output::Done(vec!["unclaimed".to_string()])),
                AccessDecision::Denied { region } => {
                    let name = ctx
                        .manager()
                        .region(&region)
                        .map(|shared| describe(&shared))
                        .transpose()?
                        .map(|(_, name)| name)
                        .unwrap_or_else(|| region.to_string());
                    Ok(Output::Refused(
                        catalog.render(MessageKey::AreaProtected, &[("region", &name)]),
                    ))
                }
            }
        }

        Command::Console => Err(anyhow!("the console cannot be nested")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimguard_core::core_region::{ClaimLimits, ManagerSettings, MemoryRegionStore, RegionManager};
    use std::sync::Arc;

    fn setup() -> (ProtectionContext, MessageCatalog, Config) {
        let store = Arc::new(MemoryRegionStore::new());
        let manager = Arc::new(RegionManager::new(store, ManagerSettings::default()));
        let ctx = ProtectionContext::new(manager, ClaimLimits::default(), None);
        (ctx, MessageCatalog::english(), Config::default())
    }

    fn run(ctx: &ProtectionContext, catalog: &MessageCatalog, config: &Config, command: Command) -> Output {
        execute(ctx, catalog, config, command).unwrap()
    }

    fn claim(owner: &str, x: i32) -> Command {
        Command::Claim {
            player: owner.to_string(),
            world: "world".to_string(),
            x,
            y: 64,
            z: 0,
            tiers: vec![],
        }
    }

    #[test]
    fn test_claim_then_check() {
        let (ctx, catalog, config) = setup();
        assert!(matches!(run(&ctx, &catalog, &config, claim("alice", 0)), Output::Done(_)));

        let check = |player: &str| Command::Check {
            player: player.to_string(),
            world: "world".to_string(),
            x: 2,
            y: 64,
            z: 0,
            action: ActionArg::Place,
            bypass: false,
        };
        assert!(matches!(run(&ctx, &catalog, &config, check("alice")), Output::Done(_)));
        match run(&ctx, &catalog, &config, check("bob")) {
            Output::Refused(message) => assert!(message.starts_with("This area is protected by")),
            other => panic!("expected refusal, got {:?}", other),
        }
    }

    #[test]
    fn test_refusal_uses_failure_message() {
        let (ctx, catalog, config) = setup();
        run(&ctx, &catalog, &config, claim("alice", 0));
        let name = ctx.manager().regions()[0].read().unwrap().name.clone();

        let output = run(
            &ctx,
            &catalog,
            &config,
            Command::Rename {
                player: "bob".to_string(),
                region: name,
                name: "mine".to_string(),
            },
        );
        match output {
            Output::Refused(message) => assert_eq!(message, catalog.template(MessageKey::FailedAccess)),
            other => panic!("expected refusal, got {:?}", other),
        }
    }

    #[test]
    fn test_invite_accept_by_latest() {
        let (ctx, catalog, config) = setup();
        run(&ctx, &catalog, &config, claim("alice", 0));
        let name = ctx.manager().regions()[0].read().unwrap().name.clone();

        let invited = run(
            &ctx,
            &catalog,
            &config,
            Command::Invite {
                player: "alice".to_string(),
                region: name.clone(),
                target: "bob".to_string(),
            },
        );
        assert!(matches!(invited, Output::Done(_)));

        match run(&ctx, &catalog, &config, Command::Accept { player: "bob".to_string(), region: None }) {
            Output::Done(lines) => assert_eq!(lines, vec![format!("You joined {}.", name)]),
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_region() {
        let (ctx, catalog, config) = setup();
        let output = run(
            &ctx,
            &catalog,
            &config,
            Command::Info {
                region: "nowhere".to_string(),
                json: false,
            },
        );
        assert!(matches!(output, Output::Refused(_)));
    }
}
