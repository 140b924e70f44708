//! Filter compilation and binding.
//!
//! Compilation turns a [`Filter`] tree into an ordered list of
//! [`PredicatePart`]s. It knows the schema (so it can pick the right shape
//! per cardinality) but not the statement: attribute columns and the
//! per-row item identity stay placeholders. [`CompiledPredicate::bind`]
//! fills them in for one concrete statement, so the same predicate serves
//! the primary statement and every collection statement.
//!
//! ```text
//! Inline / ManyToOne   <attr> <op> ?
//! OneToMany            EXISTS(SELECT VAL.<id> FROM <collection> VAL
//!                             WHERE VAL.<id> = <anchor> AND VAL.<value> <op> ?)
//! ManyToMany           EXISTS(SELECT NM.<id> FROM <junction> NM
//!                             INNER JOIN <values> VAL ON NM.<vid> = VAL.<vid>
//!                             WHERE NM.<id> = <anchor> AND VAL.<value> <op> ?)
//! ```

use std::collections::{BTreeSet, HashMap};

use uuid::Uuid;

use super::attributes::{AttributeRef, AttributeRefs};
use super::tables::{ColumnRef, StatementTables};
use super::CompilerOptions;
use crate::error::{QueryError, QueryResult};
use crate::model::{AttributePath, BooleanOperator, Filter, RelationalOperator, Value};
use crate::schema::{AspectId, AttributeSpec, AttributeStorage, SchemaSnapshot, StorageNaming};
use crate::sql::{QualifiedColumn, SqlDialect};

/// One element of a compiled predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum PredicatePart {
    /// Literal SQL text.
    Sql(String),
    /// Column of a bounded attribute, resolved at bind time.
    Attribute(AttributeRef),
    /// Index into the predicate's parameter list.
    Param(usize),
    /// Item identity expression of the enclosing statement.
    Anchor,
}

/// SQL text and parameters of a predicate bound to one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundPredicate {
    pub sql: String,
    pub params: Vec<Value>,
}

/// A filter tree compiled against one schema snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledPredicate {
    parts: Vec<PredicatePart>,
    params: Vec<Value>,
    attributes: Vec<(AttributeRef, AttributePath)>,
    aspects: BTreeSet<AspectId>,
}

impl CompiledPredicate {
    /// The always-true predicate.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile `filter`, allocating one [`AttributeRef`] per bounded
    /// attribute mention.
    pub fn compile(
        filter: Option<&Filter>,
        schema: &SchemaSnapshot,
        refs: &mut AttributeRefs,
        options: &CompilerOptions,
    ) -> QueryResult<Self> {
        let Some(filter) = filter else {
            return Ok(Self::empty());
        };

        let mut compiler = PredicateCompiler {
            schema,
            naming: schema.naming(),
            refs,
            options,
            params: Vec::new(),
            attributes: Vec::new(),
            aspects: BTreeSet::new(),
        };
        let parts = compiler.compile_node(filter)?;
        let predicate = Self {
            parts,
            params: compiler.params,
            attributes: compiler.attributes,
            aspects: compiler.aspects,
        };
        tracing::trace!(
            parts = predicate.parts.len(),
            params = predicate.params.len(),
            "predicate compiled"
        );
        Ok(predicate)
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn parts(&self) -> &[PredicatePart] {
        &self.parts
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Bounded attributes the statement must resolve before binding.
    pub fn attributes(&self) -> impl Iterator<Item = AttributeRef> + '_ {
        self.attributes.iter().map(|(attr, _)| *attr)
    }

    /// Aspect types referenced anywhere in the filter.
    pub fn aspects(&self) -> &BTreeSet<AspectId> {
        &self.aspects
    }

    /// `self AND other`, renumbering `other`'s parameters.
    pub fn conjoin(&self, other: &CompiledPredicate) -> CompiledPredicate {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }

        let offset = self.params.len();
        let mut parts = Vec::with_capacity(self.parts.len() + other.parts.len() + 3);
        parts.push(PredicatePart::Sql("(".into()));
        parts.extend(self.parts.iter().cloned());
        parts.push(PredicatePart::Sql(" AND ".into()));
        parts.extend(other.parts.iter().map(|part| match part {
            PredicatePart::Param(i) => PredicatePart::Param(i + offset),
            other => other.clone(),
        }));
        parts.push(PredicatePart::Sql(")".into()));

        let mut params = self.params.clone();
        params.extend(other.params.iter().cloned());
        let mut attributes = self.attributes.clone();
        attributes.extend(other.attributes.iter().cloned());
        let mut aspects = self.aspects.clone();
        aspects.extend(other.aspects.iter().cloned());

        CompiledPredicate {
            parts,
            params,
            attributes,
            aspects,
        }
    }

    /// Render against one statement.
    ///
    /// Fails if an attribute part has no entry in `resolved`, which means
    /// the statement builder never joined it.
    pub fn bind(
        &self,
        resolved: &HashMap<AttributeRef, ColumnRef>,
        tables: &StatementTables,
        anchor: &QualifiedColumn,
    ) -> QueryResult<BoundPredicate> {
        let mut sql = String::new();
        let mut params = Vec::with_capacity(self.params.len());

        for part in &self.parts {
            match part {
                PredicatePart::Sql(text) => sql.push_str(text),
                PredicatePart::Attribute(attr) => {
                    let column = resolved
                        .get(attr)
                        .ok_or_else(|| QueryError::UnresolvedAttribute(self.path_of(*attr)))?;
                    sql.push_str(&tables.qualify(column).render());
                }
                PredicatePart::Param(i) => {
                    sql.push('?');
                    params.push(self.params[*i].clone());
                }
                PredicatePart::Anchor => sql.push_str(&anchor.render()),
            }
        }

        Ok(BoundPredicate { sql, params })
    }

    fn path_of(&self, attr: AttributeRef) -> AttributePath {
        self.attributes
            .iter()
            .find(|(a, _)| *a == attr)
            .map(|(_, path)| path.clone())
            .unwrap_or_else(|| AttributePath::new("?", format!("#{}", attr.index())))
    }
}

// =============================================================================
// Compiler
// =============================================================================

/// Comparison applied to an attribute, independent of where it is stored.
enum Comparison<'f> {
    Relational(RelationalOperator, &'f Value),
    Like {
        pattern: &'f str,
        escape: Option<char>,
        case_sensitive: bool,
    },
    SimilarTo {
        pattern: &'f str,
        escape: Option<char>,
    },
    Between(&'f Value, &'f Value),
    In(&'f [Value]),
}

struct PredicateCompiler<'a> {
    schema: &'a SchemaSnapshot,
    naming: &'a StorageNaming,
    refs: &'a mut AttributeRefs,
    options: &'a CompilerOptions,
    params: Vec<Value>,
    attributes: Vec<(AttributeRef, AttributePath)>,
    aspects: BTreeSet<AspectId>,
}

impl<'a> PredicateCompiler<'a> {
    fn compile_node(&mut self, filter: &Filter) -> QueryResult<Vec<PredicatePart>> {
        match filter {
            Filter::Combine { op, operands } => self.compile_combinator(*op, operands),
            Filter::Not { filter } => {
                let inner = self.compile_node(filter)?;
                if inner.is_empty() {
                    // Negated "no restriction" matches nothing.
                    return Ok(vec![sql("1 = 2")]);
                }
                let mut parts = vec![sql("NOT (")];
                parts.extend(inner);
                parts.push(sql(")"));
                Ok(parts)
            }
            Filter::Empty { attribute } => self.compile_empty(attribute),
            Filter::Relational {
                attribute,
                op,
                value,
            } => self.compile_comparison(attribute, Comparison::Relational(*op, value)),
            Filter::Like {
                attribute,
                pattern,
                escape,
                case_sensitive,
            } => self.compile_comparison(
                attribute,
                Comparison::Like {
                    pattern,
                    escape: *escape,
                    case_sensitive: *case_sensitive,
                },
            ),
            Filter::SimilarTo {
                attribute,
                pattern,
                escape,
            } => self.compile_comparison(
                attribute,
                Comparison::SimilarTo {
                    pattern,
                    escape: *escape,
                },
            ),
            Filter::Between {
                attribute,
                low,
                high,
            } => self.compile_comparison(attribute, Comparison::Between(low, high)),
            Filter::In { attribute, values } => {
                self.compile_comparison(attribute, Comparison::In(values))
            }
            Filter::ItemIds { ids } => Ok(self.compile_item_ids(ids)),
            Filter::False => Ok(vec![sql("1 = 2")]),
        }
    }

    fn compile_combinator(
        &mut self,
        op: BooleanOperator,
        operands: &[Filter],
    ) -> QueryResult<Vec<PredicatePart>> {
        let params = self.params.len();
        let attributes = self.attributes.len();
        let aspects = self.aspects.clone();

        // An operand without parts places no restriction. AND drops it; OR
        // with such an operand places no restriction either.
        let mut unrestricted = false;
        let mut compiled = Vec::with_capacity(operands.len());
        for operand in operands {
            let parts = self.compile_node(operand)?;
            if parts.is_empty() {
                unrestricted = true;
            } else {
                compiled.push(parts);
            }
        }

        if unrestricted && op == BooleanOperator::Or {
            self.params.truncate(params);
            self.attributes.truncate(attributes);
            self.aspects = aspects;
            return Ok(Vec::new());
        }

        if compiled.len() <= 1 {
            return Ok(compiled.pop().unwrap_or_default());
        }

        let separator = match op {
            BooleanOperator::And => " AND ",
            BooleanOperator::Or => " OR ",
        };
        let mut parts = vec![sql("(")];
        for (i, operand) in compiled.into_iter().enumerate() {
            if i > 0 {
                parts.push(sql(separator));
            }
            parts.extend(operand);
        }
        parts.push(sql(")"));
        Ok(parts)
    }

    fn compile_empty(&mut self, path: &AttributePath) -> QueryResult<Vec<PredicatePart>> {
        let spec = self.lookup(path)?;
        match spec.storage() {
            AttributeStorage::Inline { .. } | AttributeStorage::ManyToOne { .. } => {
                let attr = self.add_attribute(spec);
                Ok(vec![PredicatePart::Attribute(attr), sql(" IS NULL")])
            }
            storage => Ok(vec![
                sql(&format!("NOT {}", self.exists_prefix(storage))),
                PredicatePart::Anchor,
                sql(" )"),
            ]),
        }
    }

    fn compile_comparison(
        &mut self,
        path: &AttributePath,
        comparison: Comparison<'_>,
    ) -> QueryResult<Vec<PredicatePart>> {
        let spec = self.lookup(path)?;
        match spec.storage() {
            AttributeStorage::Inline { .. } | AttributeStorage::ManyToOne { .. } => {
                let attr = self.add_attribute(spec);
                self.render_comparison(PredicatePart::Attribute(attr), spec, &comparison)
            }
            storage => {
                let mut parts = vec![sql(&self.exists_prefix(storage)), PredicatePart::Anchor];
                parts.push(sql(" AND "));
                let value = sql(&format!("VAL.{}", self.naming.value_column));
                parts.extend(self.render_comparison(value, spec, &comparison)?);
                parts.push(sql(")"));
                Ok(parts)
            }
        }
    }

    /// `EXISTS(SELECT ... WHERE <id> = `, to be followed by the anchor.
    fn exists_prefix(&self, storage: &AttributeStorage) -> String {
        let id = &self.naming.item_id_column;
        match storage {
            AttributeStorage::ManyToMany {
                junction_table,
                value_table,
            } => format!(
                "EXISTS(SELECT NM.{id} FROM {junction} NM INNER JOIN {values} VAL ON NM.{vid} = VAL.{vid} WHERE NM.{id} = ",
                id = id,
                junction = junction_table,
                values = value_table,
                vid = self.naming.value_id_column,
            ),
            AttributeStorage::OneToMany { collection_table } => format!(
                "EXISTS(SELECT VAL.{id} FROM {table} VAL WHERE VAL.{id} = ",
                id = id,
                table = collection_table,
            ),
            // Bounded storage never reaches a correlated subquery.
            AttributeStorage::Inline { .. } | AttributeStorage::ManyToOne { .. } => String::new(),
        }
    }

    fn render_comparison(
        &mut self,
        operand: PredicatePart,
        spec: &AttributeSpec,
        comparison: &Comparison<'_>,
    ) -> QueryResult<Vec<PredicatePart>> {
        let parts = match comparison {
            Comparison::Relational(op, value) => {
                let param = self.param(spec, value)?;
                vec![operand, sql(&format!(" {} ", op.as_sql())), param]
            }
            Comparison::Like {
                pattern,
                escape,
                case_sensitive,
            } => {
                let param = self.text_param(pattern);
                let mut parts = if *case_sensitive {
                    vec![operand, sql(" LIKE "), param]
                } else {
                    vec![sql("UPPER("), operand, sql(") LIKE UPPER("), param, sql(")")]
                };
                parts.extend(self.escape_clause(*escape));
                parts
            }
            Comparison::SimilarTo { pattern, escape } => {
                if !self.options.dialect.supports_similar_to() {
                    return Err(QueryError::UnsupportedOperator {
                        operator: "SIMILAR TO",
                        dialect: self.options.dialect.name(),
                    });
                }
                let param = self.text_param(pattern);
                let mut parts = vec![operand, sql(" SIMILAR TO "), param];
                parts.extend(self.escape_clause(*escape));
                parts
            }
            Comparison::Between(low, high) => {
                let low = self.param(spec, low)?;
                let high = self.param(spec, high)?;
                vec![operand, sql(" BETWEEN "), low, sql(" AND "), high]
            }
            Comparison::In(values) => {
                if values.is_empty() {
                    return Err(QueryError::EmptyInList(spec.path()));
                }
                let mut clusters = Vec::new();
                for chunk in values.chunks(self.options.max_in_values.max(1)) {
                    let mut cluster = vec![operand.clone(), sql(" IN (")];
                    for (i, value) in chunk.iter().enumerate() {
                        if i > 0 {
                            cluster.push(sql(", "));
                        }
                        cluster.push(self.param(spec, value)?);
                    }
                    cluster.push(sql(")"));
                    clusters.push(cluster);
                }
                or_clusters(clusters)
            }
        };
        Ok(parts)
    }

    fn compile_item_ids(&mut self, ids: &[Uuid]) -> Vec<PredicatePart> {
        if ids.is_empty() {
            return vec![sql("1 = 2")];
        }
        let mut clusters = Vec::new();
        for chunk in ids.chunks(self.options.max_in_values.max(1)) {
            let mut cluster = vec![PredicatePart::Anchor, sql(" IN (")];
            for (i, id) in chunk.iter().enumerate() {
                if i > 0 {
                    cluster.push(sql(", "));
                }
                cluster.push(self.push_param(Value::Id(*id)));
            }
            cluster.push(sql(")"));
            clusters.push(cluster);
        }
        or_clusters(clusters)
    }

    fn escape_clause(&self, escape: Option<char>) -> Option<PredicatePart> {
        escape.map(|c| {
            sql(&format!(
                " ESCAPE {}",
                self.options.dialect.quote_string(&c.to_string())
            ))
        })
    }

    fn lookup(&mut self, path: &AttributePath) -> QueryResult<&'a AttributeSpec> {
        let schema: &'a SchemaSnapshot = self.schema;
        let spec = schema.attribute(path)?;
        self.aspects.insert(spec.aspect().clone());
        Ok(spec)
    }

    fn add_attribute(&mut self, spec: &AttributeSpec) -> AttributeRef {
        let attr = self.refs.add(spec);
        self.attributes.push((attr, spec.path()));
        attr
    }

    fn param(&mut self, spec: &AttributeSpec, value: &Value) -> QueryResult<PredicatePart> {
        let value = value
            .clone()
            .coerce(spec.value_type())
            .map_err(|message| QueryError::InvalidFilterValue {
                attribute: spec.path(),
                message,
            })?;
        Ok(self.push_param(value))
    }

    fn text_param(&mut self, text: &str) -> PredicatePart {
        self.push_param(Value::Text(text.to_string()))
    }

    fn push_param(&mut self, value: Value) -> PredicatePart {
        self.params.push(value);
        PredicatePart::Param(self.params.len() - 1)
    }
}

fn sql(text: &str) -> PredicatePart {
    PredicatePart::Sql(text.to_string())
}

/// Join IN-list clusters with OR, parenthesized when there is more than one.
fn or_clusters(mut clusters: Vec<Vec<PredicatePart>>) -> Vec<PredicatePart> {
    if clusters.len() == 1 {
        return clusters.pop().unwrap_or_default();
    }
    let mut parts = vec![sql("(")];
    for (i, cluster) in clusters.into_iter().enumerate() {
        if i > 0 {
            parts.push(sql(" OR "));
        }
        parts.extend(cluster);
    }
    parts.push(sql(")"));
    parts
}
