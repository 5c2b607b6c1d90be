//! Input checks run before anything is built.

use crate::{
    datasources::DataSources,
    directives::DirectiveMap,
    resolver::{ResolverMap, RESOLVE_REFERENCE},
    type_defs::TypeDefs,
    Error,
};

/// `/[_A-Za-z][_0-9A-Za-z]*/`
pub(crate) fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();

    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

pub(crate) fn type_defs(type_defs: &TypeDefs) -> crate::Result<()> {
    match type_defs {
        TypeDefs::Sdl(sdl) if sdl.is_empty() => Err(Error::InvalidTypeDefs("the SDL string is empty".into())),
        _ => Ok(()),
    }
}

pub(crate) fn resolvers(resolvers: &ResolverMap) -> crate::Result<()> {
    for (type_name, field_name, _) in resolvers.iter() {
        if !is_valid_name(type_name) {
            return Err(Error::InvalidResolvers(format!("`{type_name}` is not a valid type name")));
        }

        if field_name != RESOLVE_REFERENCE && !is_valid_name(field_name) {
            return Err(Error::InvalidResolvers(format!(
                "`{type_name}.{field_name}` is not a valid field name"
            )));
        }
    }

    Ok(())
}

pub(crate) fn datasources(datasources: &DataSources) -> crate::Result<()> {
    let DataSources::Map(map) = datasources else {
        return Ok(());
    };

    match map.names().find(|name| !is_valid_name(name)) {
        Some(name) => Err(Error::InvalidDataSources(format!("`{name}` is not a valid datasource name"))),
        None => Ok(()),
    }
}

pub(crate) fn directives(directives: &DirectiveMap) -> crate::Result<()> {
    match directives.names().find(|name| !is_valid_name(name)) {
        Some(name) => Err(Error::InvalidDirectives(format!("`{name}` is not a valid directive name"))),
        None => Ok(()),
    }
}
