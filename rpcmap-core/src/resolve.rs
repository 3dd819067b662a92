//! Client resolution: which identifiers in a file hold a service client.
//!
//! There is no type binding here. A token whose dotted path contains a known
//! client type name (`OrdersClient`, `Acme.Orders.OrdersClient`,
//! `Svc(Orders.OrdersClient`, `Orders.OrdersClient(channel)`) is a client
//! type mention, and two neighbours of it are taken as client variables:
//!
//! - the *following* token, which catches fields, locals and constructor
//!   parameters declared with an explicit type (`OrdersClient orders`)
//! - the token before `=` when the mention is the right-hand side of an
//!   assignment, with or without `new` (`var orders = new OrdersClient(ch)`)
//!
//! Both rules also fire on unrelated tokens that happen to match.

use std::collections::HashSet;

use crate::catalog::MethodCatalog;

const NAMESPACE_KEYWORD: &str = "namespace";
const NEW_KEYWORD: &str = "new";
const ASSIGN: &str = "=";

/// Namespace and client variables found in one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientBindings<'a> {
    /// Declared namespace; the last declaration wins.
    pub namespace: Option<&'a str>,
    /// Identifiers bound to a known client type.
    pub clients: HashSet<&'a str>,
}

impl ClientBindings<'_> {
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[inline]
fn mentions_client_type(token: &str, catalog: &MethodCatalog) -> bool {
    token
        .split(['.', '('])
        .any(|segment| catalog.is_client_name(segment))
}

#[inline]
fn variable_name(token: &str) -> Option<&str> {
    Some(token.trim_end_matches([';', ','])).filter(|name| !name.is_empty())
}

/// The variable assigned by `<variable> = [new] <tokens[idx]>`, if any.
fn assignment_target<'a>(tokens: &[&'a str], idx: usize) -> Option<&'a str> {
    let mut before = tokens[..idx].iter().rev().copied();
    let mut op = before.next()?;
    if op == NEW_KEYWORD {
        op = before.next()?;
    }
    if op != ASSIGN {
        return None;
    }
    before.next().and_then(variable_name)
}

/// Scans `tokens` left to right with one token of lookahead and up to three
/// tokens of lookbehind.
pub fn resolve_clients<'a>(tokens: &[&'a str], catalog: &MethodCatalog) -> ClientBindings<'a> {
    let mut bindings = ClientBindings::default();

    for (i, token) in tokens.iter().enumerate() {
        let next = tokens.get(i + 1).copied();

        if *token == NAMESPACE_KEYWORD {
            if let Some(namespace) = next.map(|n| n.trim_end_matches(';')) {
                if !namespace.is_empty() {
                    bindings.namespace = Some(namespace);
                }
            }
            continue;
        }

        if !mentions_client_type(token, catalog) {
            continue;
        }
        if let Some(variable) = next.and_then(variable_name) {
            bindings.clients.insert(variable);
        }
        if let Some(variable) = assignment_target(tokens, i) {
            bindings.clients.insert(variable);
        }
    }

    bindings
}
