//! Call-site matching: `<clientVariable><.Method>` with optional async suffix
//! and optional argument list.
//!
//! For a client variable `orders` and descriptor method `.Create`, all of
//! these tokens match:
//!
//! ```text
//! orders.Create          orders.CreateAsync
//! orders.Create()        orders.CreateAsync(request,
//! ```
//!
//! Cost is O(tokens x clients x methods) per file. Catalogs and client sets
//! are small, so this stays cheap next to file I/O.

use std::collections::HashSet;
use tracing::warn;

use crate::aggregate::LinkRecord;
use crate::catalog::{namespace_segment, MethodCatalog};

/// Link records found in one file plus the number of matches that had to be
/// dropped because a namespace was malformed or missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallSites {
    pub records: Vec<LinkRecord>,
    pub dropped: usize,
}

/// True when `rest` is what remains of a token after the call prefix:
/// nothing at all, or the start of an argument list.
#[inline]
fn is_call_tail(rest: &str) -> bool {
    rest.is_empty() || rest.starts_with('(')
}

/// Whether `token` is a call of `call` (`client` + `.Method`), either in its
/// plain or its `async_suffix` form.
#[inline]
pub fn is_call_of(token: &str, call: &str, async_suffix: &str) -> bool {
    let Some(rest) = token.strip_prefix(call) else {
        return false;
    };
    if is_call_tail(rest) {
        return true;
    }
    !async_suffix.is_empty() && rest.strip_prefix(async_suffix).is_some_and(is_call_tail)
}

/// Matches every token against every (client variable, method) pair.
///
/// The caller service is the first segment of the file namespace, the
/// callee the second segment of the method's namespace. A match whose
/// caller or callee cannot be determined is dropped and counted.
pub fn match_call_sites(
    tokens: &[&str],
    clients: &HashSet<&str>,
    catalog: &MethodCatalog,
    namespace: Option<&str>,
    async_suffix: &str,
) -> CallSites {
    let mut sites = CallSites::default();
    if clients.is_empty() || catalog.is_empty() {
        return sites;
    }

    let source = namespace_segment(namespace.unwrap_or_default(), 0);

    for client in clients {
        for method in catalog.methods() {
            let call = format!("{}{}", client, method.method_name);
            let hits = tokens
                .iter()
                .filter(|token| is_call_of(token, &call, async_suffix))
                .count();
            if hits == 0 {
                continue;
            }

            let target = method.target_service();
            match (&source, &target) {
                (Ok(source), Ok(target)) => {
                    let record = LinkRecord::new(source, target, &method.method_name);
                    sites.records.extend(std::iter::repeat(record).take(hits));
                }
                (Err(e), _) | (_, Err(e)) => {
                    warn!(call = %call, hits, error = %e, "dropping call sites");
                    sites.dropped += hits;
                }
            }
        }
    }

    sites
}
