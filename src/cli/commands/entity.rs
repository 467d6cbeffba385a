//! Entity commands: names offered to the model for reuse.

use console::style;

use docintake::config::Settings;
use docintake::models::EntityKind;

use crate::cli::helpers;

fn parse_kind(kind: &str) -> anyhow::Result<EntityKind> {
    EntityKind::from_str(kind).ok_or_else(|| {
        let valid: Vec<_> = EntityKind::ALL.iter().map(|k| k.as_str()).collect();
        anyhow::anyhow!("Unknown entity kind '{}' (expected one of: {})", kind, valid.join(", "))
    })
}

pub fn cmd_entity_add(settings: &Settings, kind: &str, name: &str) -> anyhow::Result<()> {
    let kind = parse_kind(kind)?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Entity name cannot be empty");
    }

    let store = helpers::open_store(settings)?;
    store.add_entity(kind, name)?;
    println!("{} Added {} '{}'", style("✓").green(), kind.as_str(), name);
    Ok(())
}

pub fn cmd_entity_list(settings: &Settings, kind: Option<&str>) -> anyhow::Result<()> {
    let filter = kind.map(parse_kind).transpose()?;
    let store = helpers::open_store(settings)?;

    let mut printed = 0;
    for kind in EntityKind::ALL {
        if filter.is_some_and(|f| f != kind) {
            continue;
        }
        let names = store.entity_names(kind)?;
        if names.is_empty() {
            continue;
        }
        println!("{}", style(kind.as_str().to_uppercase()).cyan().bold());
        for name in &names {
            println!("  {}", name);
        }
        printed += names.len();
    }

    if printed == 0 {
        println!("{} No entities registered", style("!").yellow());
    }
    Ok(())
}
