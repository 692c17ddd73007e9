use tracing::{debug, info};

use crate::config::{MiningSettings, SchemaSettings};
use crate::construct::Appearance;
use crate::error::Result;
use crate::persist::{atomically, integer_at, quote_text, StorageSession};
use crate::synthesis::RelationNames;

/// Which movies count: those of `movie_type` rated strictly above `min_rating`.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieFilter {
    pub movie_type: String,
    pub min_rating: f64,
}
impl From<&MiningSettings> for MovieFilter {
    fn from(mining: &MiningSettings) -> Self {
        Self {
            movie_type: mining.movie_type.clone(),
            min_rating: mining.min_rating,
        }
    }
}

pub struct BaseRelationBuilder {
    schema: SchemaSettings,
    filter: MovieFilter,
    relation: String,
}
impl BaseRelationBuilder {
    pub fn new(schema: &SchemaSettings, filter: MovieFilter, names: &RelationNames) -> Self {
        Self {
            schema: schema.clone(),
            filter,
            relation: names.base.clone(),
        }
    }
    /// Materializes the qualifying appearances as a temporary table, which
    /// lives as long as the session does.
    pub fn build<S: StorageSession + ?Sized>(&self, session: &mut S) -> Result<BaseRelation> {
        let relation = &self.relation;
        let rows = atomically(session, "base_relation", |s| {
            s.execute(&format!("drop table if exists temp.{relation}"))?;
            s.execute(&format!(
                "create temp table {relation} (
                    actor integer not null,
                    movie integer not null,
                    primary key (actor, movie)
                )"
            ))?;
            let rows = s.execute(&self.populate_statement())?;
            s.execute(&format!(
                "create index {relation}_by_movie on {relation} (movie)"
            ))?;
            Ok(rows)
        })?;
        info!(relation = %relation, rows, "base relation built");
        Ok(BaseRelation {
            relation: relation.clone(),
            rows,
        })
    }
    pub fn populate_statement(&self) -> String {
        format!(
            "insert into {relation} (actor, movie)
                select distinct ma.actor, ma.movie
                from {appearances} ma
                join {movies} m on ma.movie = m.id
                where ma.actor is not null
                and lower(m.type) = lower({movie_type})
                and m.avgrating > {min_rating:?}",
            relation = self.relation,
            appearances = self.schema.appearance_table,
            movies = self.schema.movie_table,
            movie_type = quote_text(&self.filter.movie_type),
            min_rating = self.filter.min_rating,
        )
    }
}

/// Handle to the materialized qualifying appearances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseRelation {
    relation: String,
    rows: usize,
}
impl BaseRelation {
    pub fn relation(&self) -> &str {
        &self.relation
    }
    pub fn rows(&self) -> usize {
        self.rows
    }
    pub fn fetch<S: StorageSession + ?Sized>(&self, session: &mut S) -> Result<Vec<Appearance>> {
        let rows = session.query(&format!(
            "select actor, movie from {} order by actor, movie",
            self.relation
        ))?;
        let mut appearances = Vec::with_capacity(rows.len());
        for row in &rows {
            appearances.push(Appearance::new(integer_at(row, 0)?, integer_at(row, 1)?));
        }
        debug!(appearances = appearances.len(), "base relation fetched");
        Ok(appearances)
    }
    pub fn release<S: StorageSession + ?Sized>(&self, session: &mut S) -> Result<()> {
        session.execute(&format!("drop table if exists temp.{}", self.relation))?;
        Ok(())
    }
}
