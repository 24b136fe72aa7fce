//! GraphQL operation descriptors.
//!
//! The document itself is supplied by the caller; this layer only decides
//! how the operation is throttled and sent.

use std::fmt;

use crate::clients::errors::InvalidOperationError;

/// The traffic class an operation is throttled under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Regular API traffic.
    #[default]
    General,
    /// Authentication endpoints (sign in, token refresh).
    Auth,
}

impl OperationKind {
    /// Returns the bucket name used in logs and errors.
    #[must_use]
    pub const fn bucket_name(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Auth => "auth",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.bucket_name())
    }
}

/// A GraphQL operation to be executed by the pipeline.
///
/// Use [`Operation::builder`] to construct operations.
///
/// # Example
///
/// ```rust
/// use shop_api_client::clients::{Operation, OperationKind};
/// use serde_json::json;
///
/// let op = Operation::builder("GetCart", "query GetCart($id: ID!) { cart(id: $id) { id } }")
///     .variables(json!({ "id": "cart-1" }))
///     .build()
///     .unwrap();
/// assert_eq!(op.kind, OperationKind::General);
///
/// let sign_in = Operation::builder("SignIn", "mutation SignIn { signIn { accessToken } }")
///     .kind(OperationKind::Auth)
///     .rate_limit_key("user@example.com")
///     .build()
///     .unwrap();
/// assert_eq!(sign_in.rate_limit_key.as_deref(), Some("user@example.com"));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    /// The operation name, sent as `operationName` and used in logs.
    pub name: String,
    /// The GraphQL document.
    pub query: String,
    /// Variables object, if any.
    pub variables: Option<serde_json::Value>,
    /// Traffic class for rate limiting.
    pub kind: OperationKind,
    /// Identity key for rate limiting. When absent, the stored user id or
    /// `"anonymous"` is used.
    pub rate_limit_key: Option<String>,
}

impl Operation {
    /// Creates a new builder for an operation.
    #[must_use]
    pub fn builder(name: impl Into<String>, query: impl Into<String>) -> OperationBuilder {
        OperationBuilder::new(name, query)
    }

    /// Validates the operation.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidOperationError`] if the name or document is empty, or
    /// the variables are not a JSON object.
    pub fn verify(&self) -> Result<(), InvalidOperationError> {
        if self.name.trim().is_empty() {
            return Err(InvalidOperationError::EmptyName);
        }
        if self.query.trim().is_empty() {
            return Err(InvalidOperationError::EmptyQuery {
                name: self.name.clone(),
            });
        }
        if self.variables.as_ref().is_some_and(|v| !v.is_object()) {
            return Err(InvalidOperationError::VariablesNotObject {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Returns the JSON request body.
    #[must_use]
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({
            "query": self.query,
            "variables": self.variables,
            "operationName": self.name,
        })
    }
}

/// Builder for constructing [`Operation`] instances.
#[derive(Debug)]
pub struct OperationBuilder {
    name: String,
    query: String,
    variables: Option<serde_json::Value>,
    kind: OperationKind,
    rate_limit_key: Option<String>,
}

impl OperationBuilder {
    /// Creates a new builder with the given name and document.
    #[must_use]
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            variables: None,
            kind: OperationKind::General,
            rate_limit_key: None,
        }
    }

    /// Sets the variables object.
    #[must_use]
    pub fn variables(mut self, variables: serde_json::Value) -> Self {
        self.variables = Some(variables);
        self
    }

    /// Adds a single variable.
    #[must_use]
    pub fn variable(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        let variables = self
            .variables
            .get_or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
        if let Some(map) = variables.as_object_mut() {
            map.insert(key.into(), value.into());
        }
        self
    }

    /// Sets the traffic class.
    #[must_use]
    pub const fn kind(mut self, kind: OperationKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the rate limiting identity key.
    #[must_use]
    pub fn rate_limit_key(mut self, key: impl Into<String>) -> Self {
        self.rate_limit_key = Some(key.into());
        self
    }

    /// Builds and validates the operation.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidOperationError`] if validation fails.
    pub fn build(self) -> Result<Operation, InvalidOperationError> {
        let operation = Operation {
            name: self.name,
            query: self.query,
            variables: self.variables,
            kind: self.kind,
            rate_limit_key: self.rate_limit_key,
        };
        operation.verify()?;
        Ok(operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_defaults_to_general() {
        let op = Operation::builder("GetShop", "query { shop { name } }")
            .build()
            .unwrap();
        assert_eq!(op.kind, OperationKind::General);
        assert!(op.variables.is_none());
        assert!(op.rate_limit_key.is_none());
    }

    #[test]
    fn test_variable_accumulates() {
        let op = Operation::builder("AddToCart", "mutation { add }")
            .variable("productId", "p1")
            .variable("quantity", 2)
            .build()
            .unwrap();
        assert_eq!(op.variables, Some(json!({"productId": "p1", "quantity": 2})));
    }

    #[test]
    fn test_body_shape() {
        let op = Operation::builder("GetCart", "query GetCart { cart { id } }")
            .variables(json!({"id": "c1"}))
            .build()
            .unwrap();
        assert_eq!(
            op.to_body(),
            json!({
                "query": "query GetCart { cart { id } }",
                "variables": {"id": "c1"},
                "operationName": "GetCart"
            })
        );
    }

    #[test]
    fn test_validation_failures() {
        assert_eq!(
            Operation::builder("", "query { a }").build(),
            Err(InvalidOperationError::EmptyName)
        );
        assert!(matches!(
            Operation::builder("Empty", "   ").build(),
            Err(InvalidOperationError::EmptyQuery { .. })
        ));
        assert!(matches!(
            Operation::builder("Bad", "query { a }")
                .variables(json!([1, 2]))
                .build(),
            Err(InvalidOperationError::VariablesNotObject { .. })
        ));
    }

    #[test]
    fn test_bucket_names() {
        assert_eq!(OperationKind::General.to_string(), "general");
        assert_eq!(OperationKind::Auth.bucket_name(), "auth");
    }
}
