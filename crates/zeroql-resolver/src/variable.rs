use indexmap::IndexMap;
use serde::Serialize;

/// Where the value of a query variable comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum VariableValue {
    /// Bound at request time; emitted as `$name`.
    Variable(String),
    /// Substituted verbatim, used for fragment parameters.
    Constant(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphQLQueryVariable {
    pub name: String,
    pub graphql_type: String,
    pub value: VariableValue,
}

impl GraphQLQueryVariable {
    pub fn variable(name: impl Into<String>, graphql_type: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            value: VariableValue::Variable(format!("${name}")),
            graphql_type: graphql_type.into(),
            name,
        }
    }

    pub fn constant(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graphql_type: String::new(),
            value: VariableValue::Constant(value.into()),
        }
    }

    /// Text substituted where the variable is used.
    pub fn graphql_value(&self) -> &str {
        match &self.value {
            VariableValue::Variable(v) | VariableValue::Constant(v) => v,
        }
    }
}

/// Operation variables in registration order. A name registered twice
/// keeps its first binding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VariableSet(IndexMap<String, GraphQLQueryVariable>);

impl VariableSet {
    pub fn insert(&mut self, variable: GraphQLQueryVariable) -> &GraphQLQueryVariable {
        self.0.entry(variable.name.clone()).or_insert(variable)
    }

    pub fn get(&self, name: &str) -> Option<&GraphQLQueryVariable> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GraphQLQueryVariable> {
        self.0.values()
    }

    /// `$a: Int!, $b: String`
    pub fn declaration(&self) -> String {
        self.0
            .values()
            .map(|v| format!("${}: {}", v.name, v.graphql_type))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_keep_first_binding() {
        let mut set = VariableSet::default();
        set.insert(GraphQLQueryVariable::variable("id", "Int!"));
        let kept = set.insert(GraphQLQueryVariable::variable("id", "String"));
        assert_eq!(kept.graphql_type, "Int!");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn declaration_follows_registration_order() {
        let mut set = VariableSet::default();
        set.insert(GraphQLQueryVariable::variable("b", "String"));
        set.insert(GraphQLQueryVariable::variable("a", "Int!"));
        assert_eq!(set.declaration(), "$b: String, $a: Int!");
    }

    #[test]
    fn values() {
        assert_eq!(GraphQLQueryVariable::variable("id", "Int!").graphql_value(), "$id");
        assert_eq!(GraphQLQueryVariable::constant("size", "{{size}}").graphql_value(), "{{size}}");
    }
}
