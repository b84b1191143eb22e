use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use nuztrack_ai::{gateway_from_env, AiActions};
use nuztrack_dex::{DexClient, DEFAULT_API_BASE};
use nuztrack_prospector::{Direction, Prospector, ProspectorState};
use nuztrack_schema::{HuntEntry, TeamMember};
use nuztrack_storage::{JsonFileStore, LocalStore};
use nuztrack_stores::{HuntingListStore, LikedStore, StoryGoalStore, TeamStore};
use nuztrack_transfer::{serve, LockStore, TransferClient};

#[derive(Parser)]
#[command(name = "nuztrack", version, about = "Nuzlocke run companion")]
struct Cli {
    #[arg(long, default_value = ".nuztrack", help = "Data directory for run state")]
    data_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_API_BASE, help = "Reference data API base URL")]
    api_base: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Show the full record for one Pokémon")]
    Dex {
        #[arg(help = "Name or dex number")]
        name: String,
    },
    #[command(subcommand, about = "Per-area hunting list")]
    Hunt(HuntCommands),
    #[command(subcommand, about = "Team roster")]
    Team(TeamCommands),
    #[command(subcommand, about = "Story goal checklist")]
    Goal(GoalCommands),
    #[command(subcommand, about = "Liked Pokémon")]
    Like(LikeCommands),
    #[command(subcommand, about = "Browse candidates for the next catch")]
    Prospect(ProspectCommands),
    #[command(subcommand, about = "Move run state between devices")]
    Transfer(TransferCommands),
    #[command(about = "Run the transfer server")]
    Serve {
        #[arg(long, default_value = "127.0.0.1:8471", help = "Listen address")]
        addr: String,
    },
}

#[derive(Subcommand)]
enum HuntCommands {
    #[command(about = "Add a Pokémon to an area's hunting list")]
    Add {
        #[arg(help = "Area name")]
        area: String,
        #[arg(help = "Pokémon name")]
        name: String,
    },
    #[command(about = "Remove a Pokémon from an area's hunting list")]
    Remove {
        #[arg(help = "Area name")]
        area: String,
        #[arg(help = "Pokémon name or dex number")]
        name: String,
    },
    #[command(about = "Show the hunting list")]
    List,
}

#[derive(Subcommand)]
enum TeamCommands {
    #[command(about = "Add a team member")]
    Add {
        #[arg(help = "Species name")]
        species: String,
        #[arg(long, default_value_t = 5, help = "Level (1-100)")]
        level: u8,
    },
    #[command(about = "Remove a team member")]
    Remove {
        #[arg(help = "Member id (prefix accepted)")]
        id: String,
    },
    #[command(about = "Set a member's nickname")]
    Nickname {
        #[arg(help = "Member id (prefix accepted)")]
        id: String,
        #[arg(help = "New nickname; omit to clear")]
        nickname: Option<String>,
    },
    #[command(about = "Set a member's level")]
    Level {
        #[arg(help = "Member id (prefix accepted)")]
        id: String,
        #[arg(help = "Level (1-100)")]
        level: u8,
    },
    #[command(about = "Set one of a member's four move slots")]
    Move {
        #[arg(help = "Member id (prefix accepted)")]
        id: String,
        #[arg(help = "Slot number (1-4)")]
        slot: usize,
        #[arg(help = "Move name")]
        name: String,
    },
    #[command(about = "Toggle a member's shiny flag")]
    Shiny {
        #[arg(help = "Member id (prefix accepted)")]
        id: String,
    },
    #[command(about = "Show the team")]
    List,
}

#[derive(Subcommand)]
enum GoalCommands {
    #[command(about = "Add a goal")]
    Add {
        #[arg(help = "Goal text")]
        text: String,
    },
    #[command(about = "Parse goals out of pasted walkthrough text (needs AI)")]
    Parse {
        #[arg(help = "Free-form text to parse")]
        text: String,
    },
    #[command(about = "Toggle a goal's completion")]
    Toggle {
        #[arg(help = "Goal id (prefix accepted)")]
        id: String,
    },
    #[command(about = "Remove a goal")]
    Remove {
        #[arg(help = "Goal id (prefix accepted)")]
        id: String,
    },
    #[command(about = "Show all goals")]
    List,
}

#[derive(Subcommand)]
enum LikeCommands {
    #[command(about = "Toggle liking a Pokémon")]
    Toggle {
        #[arg(help = "Pokémon name or dex number")]
        name: String,
    },
    #[command(about = "Show liked Pokémon")]
    List,
}

#[derive(Subcommand)]
enum ProspectCommands {
    #[command(about = "Browse candidates of one type")]
    Filter {
        #[arg(help = "Type name, e.g. water")]
        type_name: String,
        #[arg(long, default_value_t = 0, help = "Steps to advance before printing")]
        step: usize,
    },
    #[command(about = "Browse candidates from a free-form prompt (needs AI)")]
    Prompt {
        #[arg(help = "What you are looking for")]
        prompt: String,
    },
    #[command(about = "Browse candidates that complement the current team (needs AI)")]
    Suggest,
    #[command(about = "Look one Pokémon up by name")]
    Name {
        #[arg(help = "Pokémon name")]
        name: String,
    },
}

#[derive(Subcommand)]
enum TransferCommands {
    #[command(about = "Lock local run state on the server, printing a PIN")]
    Lock {
        #[arg(long, default_value = "http://127.0.0.1:8471", help = "Transfer server URL")]
        server: String,
    },
    #[command(about = "Redeem a PIN, replacing local run state")]
    Unlock {
        #[arg(help = "4-digit PIN")]
        pin: String,
        #[arg(long, default_value = "http://127.0.0.1:8471", help = "Transfer server URL")]
        server: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let store: Arc<dyn LocalStore> = Arc::new(JsonFileStore::new(&cli.data_dir));
    let dex = DexClient::new(cli.api_base.clone(), store.clone());
    let ai = AiActions::new(gateway_from_env(), store.clone());

    match cli.command {
        Commands::Dex { name } => {
            let record = dex.pokemon(&name).await?;
            print_record(&record);
        }
        Commands::Hunt(cmd) => {
            let hunts = HuntingListStore::new(store.clone());
            match cmd {
                HuntCommands::Add { area, name } => {
                    let record = dex.pokemon(&name).await?;
                    let added = hunts.add(
                        &area,
                        HuntEntry {
                            pokemon_id: record.id,
                            pokemon_name: record.name.clone(),
                        },
                    );
                    if added {
                        println!("Added {} to {area}.", record.name);
                    } else {
                        println!("{} is already listed for {area}.", record.name);
                    }
                }
                HuntCommands::Remove { area, name } => {
                    let record = dex.pokemon(&name).await?;
                    if hunts.remove(&area, record.id) {
                        println!("Removed {} from {area}.", record.name);
                    } else {
                        println!("{} was not listed for {area}.", record.name);
                    }
                }
                HuntCommands::List => {
                    let map = hunts.snapshot();
                    if map.is_empty() {
                        println!("Hunting list is empty.");
                    }
                    for (area, entries) in &map {
                        println!("{area}:");
                        for entry in entries {
                            println!("  #{:04} {}", entry.pokemon_id, entry.pokemon_name);
                        }
                    }
                }
            }
        }
        Commands::Team(cmd) => {
            let team = TeamStore::new(store.clone());
            match cmd {
                TeamCommands::Add { species, level } => {
                    let mut member = TeamMember::new(species.as_str(), level);
                    // Best effort enrichment; an offline add still works.
                    if let Ok(record) = dex.pokemon(&species).await {
                        member.pokemon_id = Some(record.id);
                        member.types = record.types;
                    }
                    team.add_member(member);
                    println!("Added {species} at level {level}.");
                }
                TeamCommands::Remove { id } => {
                    let id = resolve_id(&id, team.snapshot().iter().map(|m| m.id.clone()))?;
                    team.remove(&id);
                    println!("Removed.");
                }
                TeamCommands::Nickname { id, nickname } => {
                    let id = resolve_id(&id, team.snapshot().iter().map(|m| m.id.clone()))?;
                    team.set_nickname(&id, nickname);
                    println!("Nickname updated.");
                }
                TeamCommands::Level { id, level } => {
                    let id = resolve_id(&id, team.snapshot().iter().map(|m| m.id.clone()))?;
                    team.set_level(&id, level);
                    println!("Level updated.");
                }
                TeamCommands::Move { id, slot, name } => {
                    anyhow::ensure!(
                        (1..=nuztrack_schema::TEAM_MOVE_SLOTS).contains(&slot),
                        "slot must be between 1 and {}",
                        nuztrack_schema::TEAM_MOVE_SLOTS
                    );
                    let id = resolve_id(&id, team.snapshot().iter().map(|m| m.id.clone()))?;
                    team.set_move(&id, slot - 1, &name);
                    println!("Move slot {slot} set to {name}.");
                }
                TeamCommands::Shiny { id } => {
                    let id = resolve_id(&id, team.snapshot().iter().map(|m| m.id.clone()))?;
                    team.toggle_shiny(&id);
                    println!("Shiny flag toggled.");
                }
                TeamCommands::List => {
                    let members = team.snapshot();
                    if members.is_empty() {
                        println!("Team is empty.");
                    }
                    for member in &members {
                        let name = member.nickname.as_deref().unwrap_or(&member.species);
                        println!(
                            "{:<10} {name} ({}) lv.{}{}",
                            &member.id[..8.min(member.id.len())],
                            member.species,
                            member.level,
                            if member.shiny { " ✨" } else { "" },
                        );
                        let moves: Vec<&str> = member
                            .moves
                            .iter()
                            .filter(|m| !m.is_empty())
                            .map(String::as_str)
                            .collect();
                        if !moves.is_empty() {
                            println!("           moves: {}", moves.join(", "));
                        }
                    }
                }
            }
        }
        Commands::Goal(cmd) => {
            let goals = StoryGoalStore::new(store.clone());
            match cmd {
                GoalCommands::Add { text } => {
                    if goals.add(&text) {
                        println!("Goal added.");
                    } else {
                        println!("Goal text is empty; nothing added.");
                    }
                }
                GoalCommands::Parse { text } => {
                    let parsed = ai.parse_story_goals(&text).await?;
                    let count = parsed.len();
                    goals.add_parsed(&parsed);
                    println!("Added {count} goals.");
                }
                GoalCommands::Toggle { id } => {
                    let id = resolve_id(&id, goals.snapshot().iter().map(|g| g.id.clone()))?;
                    goals.toggle(&id);
                    println!("Goal toggled.");
                }
                GoalCommands::Remove { id } => {
                    let id = resolve_id(&id, goals.snapshot().iter().map(|g| g.id.clone()))?;
                    goals.remove(&id);
                    println!("Goal removed.");
                }
                GoalCommands::List => {
                    let list = goals.snapshot();
                    if list.is_empty() {
                        println!("No goals yet.");
                    }
                    for goal in &list {
                        let mark = if goal.completed { "x" } else { " " };
                        print!(
                            "[{mark}] {:<10} {}",
                            &goal.id[..8.min(goal.id.len())],
                            goal.text
                        );
                        if let Some(level) = goal.level {
                            print!(" (lv.{level})");
                        }
                        if let Some(notes) = &goal.notes {
                            print!(" [{notes}]");
                        }
                        println!();
                    }
                }
            }
        }
        Commands::Like(cmd) => {
            let liked = LikedStore::new(store.clone());
            match cmd {
                LikeCommands::Toggle { name } => {
                    let record = dex.pokemon(&name).await?;
                    liked.toggle(record.id);
                    if liked.is_liked(record.id) {
                        println!("Liked {}.", record.name);
                    } else {
                        println!("Unliked {}.", record.name);
                    }
                }
                LikeCommands::List => {
                    let map = liked.snapshot();
                    if map.is_empty() {
                        println!("No liked Pokémon.");
                    }
                    for id in map.keys() {
                        println!("#{id}");
                    }
                }
            }
        }
        Commands::Prospect(cmd) => {
            let prospector = Prospector::new(Arc::new(dex), Arc::new(ai));
            match cmd {
                ProspectCommands::Filter { type_name, step } => {
                    prospector.search_by_filter(&type_name).await;
                    for _ in 0..step {
                        prospector.navigate(Direction::Next).await;
                    }
                }
                ProspectCommands::Prompt { prompt } => {
                    prospector.search_by_prompt(&prompt).await;
                }
                ProspectCommands::Suggest => {
                    let team = TeamStore::new(store.clone());
                    prospector.search_by_suggestion(&team.species()).await;
                }
                ProspectCommands::Name { name } => {
                    prospector.search_by_name(&name).await;
                }
            }
            print_prospect(&prospector.snapshot());
        }
        Commands::Transfer(cmd) => match cmd {
            TransferCommands::Lock { server } => {
                let client = TransferClient::new(server, store.clone());
                let pin = client.lock().await?;
                println!("Run state locked. PIN: {pin}");
                println!("The PIN is single use and expires in one hour.");
            }
            TransferCommands::Unlock { pin, server } => {
                let client = TransferClient::new(server, store.clone());
                let applied = client.unlock(&pin).await?;
                println!("Transfer complete: {applied} state keys applied.");
            }
        },
        Commands::Serve { addr } => {
            serve(Arc::new(LockStore::new()), &addr).await?;
        }
    }

    Ok(())
}

/// Match a possibly-shortened id against the known ids, requiring the prefix
/// to be unambiguous.
fn resolve_id(prefix: &str, ids: impl Iterator<Item = String>) -> Result<String> {
    let matches: Vec<String> = ids.filter(|id| id.starts_with(prefix)).collect();
    match matches.len() {
        0 => anyhow::bail!("no entry matches id '{prefix}'"),
        1 => Ok(matches.into_iter().next().unwrap_or_default()),
        n => anyhow::bail!("id '{prefix}' is ambiguous ({n} matches)"),
    }
}

fn print_record(record: &nuztrack_schema::PokemonRecord) {
    println!("#{:04} {} ({})", record.id, record.name, record.genus);
    println!("Types: {}", record.types.join(", "));
    let abilities: Vec<String> = record
        .abilities
        .iter()
        .map(|a| {
            if a.is_hidden {
                format!("{} (hidden)", a.display_name)
            } else {
                a.display_name.clone()
            }
        })
        .collect();
    println!("Abilities: {}", abilities.join(", "));
    for stat in &record.stats {
        println!("  {:<16} {}", stat.name, stat.value);
    }
    if !record.flavor_text.is_empty() {
        println!("{}", record.flavor_text);
    }
    if let Some(evolution) = &record.evolution {
        if let Some(previous) = &evolution.previous {
            println!("Evolves from: {}", previous.name);
        }
        for next in &evolution.next {
            let condition = next.conditions.join(", ");
            if condition.is_empty() {
                println!("Evolves into: {}", next.name);
            } else {
                println!("Evolves into: {} ({condition})", next.name);
            }
        }
    }
    if !record.moves.is_empty() {
        println!("Level-up moves:");
        for learned in &record.moves {
            println!("  lv.{:<3} {}", learned.level, learned.name);
        }
    }
}

fn print_prospect(state: &ProspectorState) {
    if let Some(error) = &state.error {
        println!("{error}");
        return;
    }
    if state.prospect_list.len() > 1 {
        println!(
            "Candidate {}/{}:",
            state.current_index + 1,
            state.prospect_list.len()
        );
    }
    match &state.prospect {
        Some(record) => print_record(record),
        None => println!("No candidate loaded."),
    }
}
