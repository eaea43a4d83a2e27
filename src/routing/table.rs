//! Route table: added routes plus declared routes.
//!
//! # Responsibilities
//! - Hold programmatically added routes in registration order
//! - Hold declared routes in declaration order, patterns precompiled
//! - Look up the first route matching a path
//!
//! # Design Decisions
//! - Built through [`RouteTableBuilder`]; `build()` freezes the table so it can
//!   be shared across dispatch passes via `Arc` without locking
//! - Added routes always take precedence over declared routes
//! - First match wins; there is no scoring or priority field

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{RouteConfig, RouteDecl};
use crate::dispatch::HandlerContext;
use crate::routing::field::{resolve_field, split_controllers};
use crate::routing::pattern::{Captures, CompiledPattern, PatternError};
use crate::routing::tier::{resolve_tier, Tier, Tiers};
use crate::session::SessionClaim;

/// Code registered against a pattern, invoked instead of the declared routes.
///
/// The handler decides on its own whether to reply.
pub trait RouteHandler: Send + Sync {
    fn handle(&self, ctx: &HandlerContext<'_>, captures: &[String]);
}

impl<F> RouteHandler for F
where
    F: Fn(&HandlerContext<'_>, &[String]) + Send + Sync,
{
    fn handle(&self, ctx: &HandlerContext<'_>, captures: &[String]) {
        self(ctx, captures)
    }
}

/// Error building the route table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("route #{index} pattern {pattern:?} failed to compile: {source}")]
    Declared {
        index: usize,
        pattern: String,
        #[source]
        source: PatternError,
    },

    #[error("added route pattern {pattern:?} failed to compile: {source}")]
    Added {
        pattern: String,
        #[source]
        source: PatternError,
    },
}

/// A programmatically registered route.
pub struct AddedRoute {
    pattern: CompiledPattern,
    handler: Arc<dyn RouteHandler>,
}

impl AddedRoute {
    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    pub fn handler(&self) -> &dyn RouteHandler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for AddedRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddedRoute")
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// A declared route with its pattern compiled.
#[derive(Debug, Clone)]
pub struct Route {
    pattern: CompiledPattern,
    tiers: Tiers,
}

/// What a matched declared route asks the dispatcher to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub tier: Tier,
    pub table: String,
    pub key: String,
    pub template: String,
    pub controllers: Vec<String>,
}

impl Route {
    pub fn from_decl(decl: &RouteDecl) -> Result<Self, PatternError> {
        Ok(Self {
            pattern: CompiledPattern::new(decl.pattern.as_str())?,
            tiers: Tiers {
                general: decl.general.clone(),
                admin: decl.admin.clone(),
                authorized: decl.authorized.clone(),
            },
        })
    }

    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    pub fn tiers(&self) -> &Tiers {
        &self.tiers
    }

    /// Pick the tier for `claim` and substitute placeholders from `captures`.
    pub fn resolve(&self, claim: &SessionClaim, captures: &[String]) -> ResolvedRoute {
        let tier = resolve_tier(&self.tiers, claim);
        let config: &RouteConfig = self.tiers.get(tier);

        ResolvedRoute {
            tier,
            table: resolve_field(&config.table, captures),
            key: resolve_field(&config.key, captures),
            template: config.template.clone(),
            controllers: split_controllers(&config.controllers),
        }
    }
}

/// The route that won a lookup, with the captures of its own pattern.
#[derive(Debug)]
pub enum RouteMatch<'a> {
    Added {
        index: usize,
        route: &'a AddedRoute,
        captures: Captures,
    },
    Declared {
        index: usize,
        route: &'a Route,
        captures: Captures,
    },
}

/// Mutable setup phase of the route table.
#[derive(Default)]
pub struct RouteTableBuilder {
    added: Vec<AddedRoute>,
    declared: Vec<Route>,
}

impl RouteTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler route. Added routes are tried in registration order.
    pub fn register_added<H>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, TableError>
    where
        H: RouteHandler + 'static,
    {
        let compiled = CompiledPattern::new(pattern).map_err(|source| TableError::Added {
            pattern: pattern.to_string(),
            source,
        })?;
        self.added.push(AddedRoute {
            pattern: compiled,
            handler: Arc::new(handler),
        });
        Ok(self)
    }

    /// Compile and append declared routes, preserving their order.
    pub fn load_declared(&mut self, decls: &[RouteDecl]) -> Result<&mut Self, TableError> {
        let offset = self.declared.len();
        for (i, decl) in decls.iter().enumerate() {
            let route = Route::from_decl(decl).map_err(|source| TableError::Declared {
                index: offset + i,
                pattern: decl.pattern.clone(),
                source,
            })?;
            self.declared.push(route);
        }
        Ok(self)
    }

    /// Freeze the table.
    pub fn build(self) -> RouteTable {
        tracing::debug!(
            added = self.added.len(),
            declared = self.declared.len(),
            "Route table built"
        );
        RouteTable {
            added: self.added,
            declared: self.declared,
        }
    }
}

/// Immutable route table shared by every dispatch pass.
#[derive(Debug)]
pub struct RouteTable {
    added: Vec<AddedRoute>,
    declared: Vec<Route>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::new()
    }

    /// First matching route: added routes first, then declared routes.
    pub fn lookup(&self, path: &str) -> Option<RouteMatch<'_>> {
        for (index, route) in self.added.iter().enumerate() {
            if let Some(captures) = route.pattern.captures(path) {
                return Some(RouteMatch::Added {
                    index,
                    route,
                    captures,
                });
            }
        }

        for (index, route) in self.declared.iter().enumerate() {
            if let Some(captures) = route.pattern.captures(path) {
                return Some(RouteMatch::Declared {
                    index,
                    route,
                    captures,
                });
            }
        }

        None
    }

    pub fn added(&self) -> &[AddedRoute] {
        &self.added
    }

    pub fn declared(&self) -> &[Route] {
        &self.declared
    }

    /// Literal table names referenced by any tier of any declared route.
    pub fn literal_tables(&self) -> BTreeSet<String> {
        self.declared
            .iter()
            .flat_map(|route| {
                let tiers = route.tiers();
                [&tiers.general, &tiers.admin, &tiers.authorized]
            })
            .map(|config| config.table.as_str())
            .filter(|table| !table.is_empty() && !table.starts_with('$'))
            .map(ToString::to_string)
            .collect()
    }
}
