//! Construction of aliased GraphQL documents.
//!
//! Historical fetches ask for the same entity at many different blocks in one
//! round trip, so documents carry one aliased top-level field per job (e.g.
//! `t1650000000: pair(...)`). Every argument value is bound as a GraphQL
//! variable rather than spliced into the query text; entity ids arrive from
//! outside the service and never end up inside the document string.

use serde_json::{Map, Value};

/// A reference to a bound variable, returned by [`QueryBuilder::bind`].
#[derive(Debug, Clone)]
pub struct Binding(String);

#[derive(Debug)]
struct Variable {
    name: String,
    gql_type: &'static str,
    value: Value,
}

/// A ready-to-execute GraphQL document: operation text plus bound variables.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDocument {
    /// Operation name, used for logging.
    pub name: String,
    /// Rendered query text.
    pub text: String,
    /// Variable values, keyed by variable name without the `$`.
    pub variables: Map<String, Value>,
    /// Top-level result keys in declaration order.
    pub aliases: Vec<String>,
}

impl QueryDocument {
    /// Stable key identifying this document and its bound values.
    ///
    /// `serde_json::Map` iterates in sorted key order, so two documents with
    /// the same text and values produce the same key.
    pub fn cache_key(&self) -> String {
        format!("{}|{}", self.text, Value::Object(self.variables.clone()))
    }
}

/// Builder assembling one composite query from aliased field entries.
#[derive(Debug)]
pub struct QueryBuilder {
    operation: &'static str,
    variables: Vec<Variable>,
    fields: Vec<String>,
    aliases: Vec<String>,
    fragments: Vec<&'static str>,
}

impl QueryBuilder {
    /// Start a new document with the given operation name.
    pub const fn new(operation: &'static str) -> Self {
        Self {
            operation,
            variables: Vec::new(),
            fields: Vec::new(),
            aliases: Vec::new(),
            fragments: Vec::new(),
        }
    }

    /// Bind a value as a fresh variable of the given GraphQL type and return
    /// a reference to it for use in field arguments.
    pub fn bind(&mut self, gql_type: &'static str, value: Value) -> Binding {
        let name = format!("v{}", self.variables.len());
        self.variables.push(Variable { name: name.clone(), gql_type, value });
        Binding(name)
    }

    /// Add one top-level field.
    ///
    /// `alias` becomes the result key; without one the field name itself is
    /// the key. Arguments reference bound variables only.
    pub fn field(
        &mut self,
        alias: Option<&str>,
        field: &str,
        args: &[(&str, &Binding)],
        selection: &str,
    ) {
        let mut rendered = String::new();
        match alias {
            Some(alias) => {
                rendered.push_str(alias);
                rendered.push_str(": ");
                rendered.push_str(field);
                self.aliases.push(alias.to_owned());
            }
            None => {
                rendered.push_str(field);
                self.aliases.push(field.to_owned());
            }
        }
        if !args.is_empty() {
            rendered.push('(');
            for (i, (name, binding)) in args.iter().enumerate() {
                if i > 0 {
                    rendered.push_str(", ");
                }
                rendered.push_str(name);
                rendered.push_str(": $");
                rendered.push_str(&binding.0);
            }
            rendered.push(')');
        }
        rendered.push_str(" { ");
        rendered.push_str(selection);
        rendered.push_str(" }");
        self.fields.push(rendered);
    }

    /// Append a fragment definition after the operation body.
    pub fn fragment(&mut self, text: &'static str) {
        self.fragments.push(text);
    }

    /// Render the document.
    pub fn build(self) -> QueryDocument {
        let mut text = String::from("query ");
        text.push_str(self.operation);
        if !self.variables.is_empty() {
            text.push('(');
            for (i, var) in self.variables.iter().enumerate() {
                if i > 0 {
                    text.push_str(", ");
                }
                text.push('$');
                text.push_str(&var.name);
                text.push_str(": ");
                text.push_str(var.gql_type);
            }
            text.push(')');
        }
        text.push_str(" { ");
        for field in &self.fields {
            text.push_str(field);
            text.push(' ');
        }
        text.push('}');
        for fragment in &self.fragments {
            text.push(' ');
            text.push_str(fragment);
        }

        let mut variables = Map::new();
        for var in self.variables {
            variables.insert(var.name, var.value);
        }
        QueryDocument {
            name: self.operation.to_owned(),
            text,
            variables,
            aliases: self.aliases,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_aliased_fields_with_variables() {
        let mut builder = QueryBuilder::new("blocksAtTimestamps");
        let from = builder.bind("Int!", json!(1_650_000_000));
        let to = builder.bind("Int!", json!(1_650_000_600));
        builder.field(
            Some("t1650000000"),
            "blocks",
            &[("from", &from), ("to", &to)],
            "number timestamp",
        );
        let doc = builder.build();

        assert_eq!(
            doc.text,
            "query blocksAtTimestamps($v0: Int!, $v1: Int!) \
             { t1650000000: blocks(from: $v0, to: $v1) { number timestamp } }"
        );
        assert_eq!(doc.variables["v0"], json!(1_650_000_000));
        assert_eq!(doc.variables["v1"], json!(1_650_000_600));
        assert_eq!(doc.aliases, vec!["t1650000000"]);
    }

    #[test]
    fn unaliased_field_uses_field_name_as_key() {
        let mut builder = QueryBuilder::new("bundle");
        let id = builder.bind("ID!", json!("1"));
        builder.field(None, "bundle", &[("id", &id)], "nativePrice");
        let doc = builder.build();
        assert_eq!(doc.aliases, vec!["bundle"]);
        assert_eq!(doc.text, "query bundle($v0: ID!) { bundle(id: $v0) { nativePrice } }");
    }

    #[test]
    fn untrusted_ids_stay_out_of_query_text() {
        let hostile = "\"}} { evil }";
        let mut builder = QueryBuilder::new("pair");
        let id = builder.bind("ID!", json!(hostile));
        builder.field(None, "pair", &[("id", &id)], "id");
        let doc = builder.build();
        assert!(!doc.text.contains(hostile));
        assert_eq!(doc.variables["v0"], json!(hostile));
    }

    #[test]
    fn fragments_render_after_body() {
        let mut builder = QueryBuilder::new("pairs");
        let ids = builder.bind("[ID!]!", json!(["0xabc"]));
        builder.field(None, "pairs", &[("ids", &ids)], "...PairFields");
        builder.fragment("fragment PairFields on Pair { id }");
        let doc = builder.build();
        assert!(doc.text.ends_with("fragment PairFields on Pair { id }"));
    }

    #[test]
    fn cache_key_is_stable_across_identical_documents() {
        let build = || {
            let mut builder = QueryBuilder::new("pair");
            let id = builder.bind("ID!", json!("0xabc"));
            builder.field(None, "pair", &[("id", &id)], "id");
            builder.build()
        };
        assert_eq!(build().cache_key(), build().cache_key());
    }
}
