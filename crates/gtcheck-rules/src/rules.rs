//! Per-call validation rules.
//!
//! Three independent checks run for every parsed call:
//! 1. method existence against the service's API surface
//! 2. user identity for methods listed in [`USER_ID_ARGUMENTS`]
//! 3. referential integrity for methods listed in [`REFERENCE_RULES`]
//!
//! Missing methods and users are errors. Reference misses are heuristic and
//! only ever warnings.

use gtcheck_kernel::{IssueSink, Locator, ParsedCall, Service, ValidationIssue};
use gtcheck_registry::backend::USERS_COLLECTION;
use gtcheck_registry::{ApiSurfaceRegistry, BackendRegistry, CollectionPath, MethodLookup};
use regex::Regex;
use std::sync::OnceLock;

/// Shape an argument must have before a reference rule looks it up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdShape {
    /// Lower-case 8-4-4-4-12 hex.
    Uuid,
    /// 16 lower-case hex characters (mail message ids).
    Hex16,
}

fn uuid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
            .expect("uuid regex must compile")
    })
}

fn hex16_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-f]{16}$").expect("hex16 regex must compile"))
}

impl IdShape {
    pub fn matches(self, text: &str) -> bool {
        match self {
            Self::Uuid => uuid_re().is_match(text),
            Self::Hex16 => hex16_re().is_match(text),
        }
    }
}

/// Where a reference rule looks for an id. Paths use [`CollectionPath`]
/// syntax and may name call arguments with `$n`.
#[derive(Debug, Clone, Copy)]
pub enum Search {
    Collection(&'static str),
    /// A sub-collection of every user.
    EachUser(&'static str),
    /// Paths under the user named by argument `owner_arg`. Skipped when
    /// that user does not exist.
    OwnedBy {
        owner_arg: usize,
        paths: &'static [&'static str],
    },
    AnyOf(&'static [Search]),
}

impl Search {
    fn owner_arg(&self) -> Option<usize> {
        match self {
            Self::OwnedBy { owner_arg, .. } => Some(*owner_arg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReferenceRule {
    pub methods: &'static [&'static str],
    pub arg_index: usize,
    pub shape: IdShape,
    /// Entity label used in findings, e.g. `Order`.
    pub entity: &'static str,
    pub search: Search,
}

const VIDEO_SEARCH: Search = Search::AnyOf(&[
    Search::EachUser("watch_history"),
    Search::EachUser("liked_videos"),
    Search::EachUser("watch_later_playlist"),
    Search::Collection("channels.*.videos"),
]);

pub const REFERENCE_RULES: &[ReferenceRule] = &[
    ReferenceRule {
        methods: &["get_message", "send_draft"],
        arg_index: 1,
        shape: IdShape::Hex16,
        entity: "Message/Draft",
        search: Search::OwnedBy {
            owner_arg: 0,
            paths: &[
                "users.$0.gmail_data.messages",
                "users.$0.gmail_data.drafts",
            ],
        },
    },
    ReferenceRule {
        methods: &["add_to_cart", "remove_from_cart"],
        arg_index: 0,
        shape: IdShape::Uuid,
        entity: "Product",
        search: Search::Collection("products"),
    },
    ReferenceRule {
        methods: &["track_package", "get_order_details"],
        arg_index: 0,
        shape: IdShape::Uuid,
        entity: "Order",
        search: Search::EachUser("orders"),
    },
    ReferenceRule {
        methods: &["rate_video", "add_comment_to_video"],
        arg_index: 0,
        shape: IdShape::Uuid,
        entity: "Video",
        search: VIDEO_SEARCH,
    },
    ReferenceRule {
        methods: &["add_to_watch_later"],
        arg_index: 1,
        shape: IdShape::Uuid,
        entity: "Video",
        search: VIDEO_SEARCH,
    },
    ReferenceRule {
        methods: &["subscribe"],
        arg_index: 0,
        shape: IdShape::Uuid,
        entity: "Channel",
        search: Search::AnyOf(&[
            Search::EachUser("channels"),
            Search::EachUser("subscriptions"),
            Search::Collection("channels"),
        ]),
    },
];

/// Methods whose argument names a user: (method, argument index).
pub const USER_ID_ARGUMENTS: &[(&str, usize)] = &[("get_user_by_id", 0)];

pub fn reference_rule(method: &str) -> Option<&'static ReferenceRule> {
    REFERENCE_RULES
        .iter()
        .find(|rule| rule.methods.contains(&method))
}

pub fn user_id_argument(method: &str) -> Option<usize> {
    USER_ID_ARGUMENTS
        .iter()
        .find_map(|(name, index)| (*name == method).then_some(*index))
}

/// File and locator every finding of one call or context is tied to.
#[derive(Debug, Clone, Copy)]
pub struct CallSite<'a> {
    pub file: &'a str,
    pub locator: Locator,
}

impl CallSite<'_> {
    pub fn error(&self, message: impl Into<String>) -> ValidationIssue {
        ValidationIssue::error(self.file, self.locator, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> ValidationIssue {
        ValidationIssue::warning(self.file, self.locator, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    Found,
    Missing,
    Skipped,
}

/// Rule evaluator over borrowed, read-only registries.
#[derive(Debug, Clone, Copy)]
pub struct ValidationRules<'r> {
    backends: &'r BackendRegistry,
    apis: &'r ApiSurfaceRegistry,
}

impl<'r> ValidationRules<'r> {
    pub fn new(backends: &'r BackendRegistry, apis: &'r ApiSurfaceRegistry) -> Self {
        Self { backends, apis }
    }

    /// Run every rule against one parsed call. `service_label` is the
    /// service key as written in the prompt and is echoed in findings.
    pub fn validate_call(
        &self,
        service_label: &str,
        call: &ParsedCall,
        site: &CallSite<'_>,
        sink: &mut impl IssueSink,
    ) {
        let Some(method) = call.method_name.as_deref() else {
            return;
        };
        let service = Service::from_label(service_label);

        match self.apis.has_method(&service, method) {
            MethodLookup::Present => {}
            MethodLookup::Missing => sink.push(
                site.error(format!("Method '{method}' not found in {service_label} API")),
            ),
            MethodLookup::NoRegistry => sink.push(site.warning(format!(
                "No API methods found for service '{service_label}'"
            ))),
        }

        // Non-literal arguments are checked by their rendered shape.
        if let Some(index) = user_id_argument(method)
            && let Some(arg) = call.arg(index)
        {
            self.check_user(service_label, &service, &arg.to_string(), site, sink);
        }

        if self.backends.get(&service).is_some()
            && let Some(rule) = reference_rule(method)
        {
            self.check_reference(service_label, &service, rule, call, site, sink);
        }
    }

    /// User-identity check for a `context` block's `user_id`.
    pub fn validate_context_user(
        &self,
        service_label: &str,
        user_id: &str,
        site: &CallSite<'_>,
        sink: &mut impl IssueSink,
    ) {
        let service = Service::from_label(service_label);
        self.check_user(service_label, &service, user_id, site, sink);
    }

    fn check_user(
        &self,
        service_label: &str,
        service: &Service,
        user_id: &str,
        site: &CallSite<'_>,
        sink: &mut impl IssueSink,
    ) {
        if self.backends.get(service).is_none() {
            sink.push(site.warning(format!(
                "No backend found for service '{service_label}'"
            )));
        } else if !self.backends.user_exists(service, user_id) {
            sink.push(site.error(format!(
                "User ID '{user_id}' not found in {service_label} backend"
            )));
        }
    }

    fn check_reference(
        &self,
        service_label: &str,
        service: &Service,
        rule: &ReferenceRule,
        call: &ParsedCall,
        site: &CallSite<'_>,
        sink: &mut impl IssueSink,
    ) {
        let Some(id) = call.arg(rule.arg_index).and_then(|arg| arg.as_str()) else {
            return;
        };
        if !rule.shape.matches(id) {
            return;
        }

        let args: Vec<Option<String>> = call.args.iter().map(|arg| arg.as_id()).collect();
        if self.search(service, &rule.search, &args, id) != Lookup::Missing {
            return;
        }

        let message = match rule.search.owner_arg().and_then(|i| args.get(i).cloned().flatten()) {
            Some(owner) => format!(
                "{} ID '{id}' not found for user '{owner}' in {service_label}",
                rule.entity
            ),
            None => format!("{} ID '{id}' not found in {service_label} backend", rule.entity),
        };
        sink.push(site.warning(message));
    }

    fn search(
        &self,
        service: &Service,
        search: &Search,
        args: &[Option<String>],
        id: &str,
    ) -> Lookup {
        match search {
            Search::Collection(path) => self.path_lookup(service, path, args, id),
            Search::EachUser(sub) => {
                self.path_lookup(service, &format!("{USERS_COLLECTION}.*.{sub}"), args, id)
            }
            Search::OwnedBy { owner_arg, paths } => {
                let Some(owner) = args.get(*owner_arg).cloned().flatten() else {
                    return Lookup::Skipped;
                };
                if !self.backends.user_exists(service, &owner) {
                    return Lookup::Skipped;
                }
                any_found(paths.iter().map(|path| self.path_lookup(service, path, args, id)))
            }
            Search::AnyOf(parts) => {
                any_found(parts.iter().map(|part| self.search(service, part, args, id)))
            }
        }
    }

    fn path_lookup(
        &self,
        service: &Service,
        raw: &str,
        args: &[Option<String>],
        id: &str,
    ) -> Lookup {
        let path: CollectionPath = match raw.parse() {
            Ok(path) => path,
            Err(error) => {
                tracing::warn!(%error, "skipping malformed reference path");
                return Lookup::Skipped;
            }
        };
        let Some(bound) = path.bind(args) else {
            return Lookup::Skipped;
        };
        if self.backends.collection_item_exists(service, &bound, id) {
            Lookup::Found
        } else {
            Lookup::Missing
        }
    }
}

/// `Found` if any lookup found the id, `Missing` if at least one ran and
/// none found it.
fn any_found(lookups: impl Iterator<Item = Lookup>) -> Lookup {
    let mut outcome = Lookup::Skipped;
    for lookup in lookups {
        match lookup {
            Lookup::Found => return Lookup::Found,
            Lookup::Missing => outcome = Lookup::Missing,
            Lookup::Skipped => {}
        }
    }
    outcome
}
