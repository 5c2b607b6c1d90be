use async_graphql::parser::{parse_schema, types::ServiceDocument};

/// The schema of a service: SDL, or a document already parsed with [`gql`].
#[derive(Clone, Debug)]
pub enum TypeDefs {
    Sdl(String),
    Document(ServiceDocument),
}

impl TypeDefs {
    /// Parses SDL; documents are returned as is.
    pub fn into_document(self) -> crate::Result<ServiceDocument> {
        match self {
            Self::Sdl(sdl) => gql(&sdl),
            Self::Document(document) => Ok(document),
        }
    }
}

impl From<&str> for TypeDefs {
    fn from(sdl: &str) -> Self {
        Self::Sdl(sdl.to_string())
    }
}

impl From<String> for TypeDefs {
    fn from(sdl: String) -> Self {
        Self::Sdl(sdl)
    }
}

impl From<ServiceDocument> for TypeDefs {
    fn from(document: ServiceDocument) -> Self {
        Self::Document(document)
    }
}

/// Parses a GraphQL schema definition.
pub fn gql(sdl: &str) -> crate::Result<ServiceDocument> {
    Ok(parse_schema(sdl)?)
}
