use rusqlite::types::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::config::SchemaSettings;
use crate::construct::{Actor, ActorHasher, Level};
use crate::error::Result;
use crate::persist::{integer_at, StorageSession};

const LOOKUP_BATCH: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedActor {
    pub actor: Actor,
    /// `None` when the member table has no (or a null) name for the actor.
    pub name: Option<String>,
}
impl fmt::Display for ResolvedActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} {}", self.actor, name),
            None => write!(f, "{} <unknown>", self.actor),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTuple {
    pub actors: Vec<ResolvedActor>,
    pub support: u64,
}
impl fmt::Display for ResolvedTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actors: Vec<String> = self.actors.iter().map(|a| a.to_string()).collect();
        write!(f, "({}) in {} movies", actors.join(", "), self.support)
    }
}

/// Puts names on the actors of a level.
pub struct ResultReporter {
    member_table: String,
}
impl ResultReporter {
    pub fn new(schema: &SchemaSettings) -> Self {
        Self {
            member_table: schema.member_table.clone(),
        }
    }
    pub fn resolve<S: StorageSession + ?Sized>(
        &self,
        session: &mut S,
        level: &Level,
    ) -> Result<Vec<ResolvedTuple>> {
        let actors: BTreeSet<Actor> = level
            .iter()
            .flat_map(|f| f.tuple().actors().iter().copied())
            .collect();
        let actors: Vec<Actor> = actors.into_iter().collect();
        let mut names: HashMap<Actor, String, ActorHasher> = HashMap::default();
        for batch in actors.chunks(LOOKUP_BATCH) {
            let ids: Vec<String> = batch.iter().map(|a| a.to_string()).collect();
            let rows = session.query(&format!(
                "select id, name from {} where id in ({})",
                self.member_table,
                ids.join(", ")
            ))?;
            for row in &rows {
                let name = match row.get(1) {
                    Some(Value::Text(name)) => name.clone(),
                    Some(Value::Integer(i)) => i.to_string(),
                    Some(Value::Real(r)) => r.to_string(),
                    _ => continue,
                };
                names.insert(integer_at(row, 0)?, name);
            }
        }
        Ok(level
            .iter()
            .map(|frequent| ResolvedTuple {
                actors: frequent
                    .tuple()
                    .actors()
                    .iter()
                    .map(|actor| ResolvedActor {
                        actor: *actor,
                        name: names.get(actor).cloned(),
                    })
                    .collect(),
                support: frequent.support(),
            })
            .collect())
    }
}
