use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::collections::BTreeMap;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// Parameter name carrying a node's declared visibility policy.
pub const ACCESS_TYPE_PARAMETER: &str = "accessType";

// --- Content Tree ---

/// ContentNode
///
/// One rendering unit of a composition. The root of a tree is a node without
/// `kind`/`parameters` of its own. Children are grouped into named slots, each
/// holding an ordered list of nodes.
///
/// Absent or `null` parameter maps, slot maps and slot arrays all read as empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ContentNode {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Renderer identifier, opaque to access control.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    #[ts(type = "Record<string, unknown>")]
    #[schema(value_type = Object)]
    pub parameters: BTreeMap<String, Value>,

    #[serde(
        rename = "_derivedData",
        alias = "derivedData",
        default,
        deserialize_with = "null_as_default"
    )]
    #[ts(type = "Record<string, unknown>")]
    #[schema(value_type = Object)]
    pub derived_data: DerivedData,

    #[serde(
        rename = "slots",
        alias = "children",
        default,
        deserialize_with = "deserialize_slots"
    )]
    #[ts(type = "Record<string, Array<ContentNode>>")]
    #[schema(value_type = Object)]
    pub children: BTreeMap<String, Vec<ContentNode>>,
}

impl ContentNode {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_access_type(self, access_type: &str) -> Self {
        self.with_parameter(ACCESS_TYPE_PARAMETER, access_type)
    }

    /// Appends `child` to the end of `slot`, creating the slot if needed.
    pub fn with_child(mut self, slot: impl Into<String>, child: ContentNode) -> Self {
        self.children.entry(slot.into()).or_default().push(child);
        self
    }

    pub fn slot(&self, name: &str) -> &[ContentNode] {
        self.children.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// The node's declared visibility policy, `Everyone` when absent or unrecognized.
    pub fn access_type(&self) -> AccessType {
        AccessType::from_parameters(&self.parameters)
    }

    /// Depth-first, pre-order visit of this node and every descendant.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ContentNode)) {
        visit(self);
        for child in self.children.values().flatten() {
            child.walk(visit);
        }
    }
}

/// DerivedData
///
/// The annotation write target of a node. The two access-control keys are typed;
/// any other derived values supplied upstream are carried through untouched.
///
/// Incoming values under the access-control keys that do not match the typed shape
/// read as absent. Annotation overwrites both keys on every node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DerivedData {
    #[serde(
        rename = "_authState",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub auth_state: Option<AuthState>,

    #[serde(
        rename = "_accessControl",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub access_control: Option<AccessDecision>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl DerivedData {
    /// Kept unless a decision explicitly denies viewing. Unannotated data is viewable.
    pub fn is_viewable(&self) -> bool {
        self.access_control
            .as_ref()
            .is_none_or(|decision| decision.allowed)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).ok())
}

fn deserialize_slots<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<ContentNode>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Option<Vec<ContentNode>>>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(slot, nodes)| (slot, nodes.unwrap_or_default()))
        .collect())
}

// --- Access Policy ---

/// AccessType
///
/// Per-node visibility policy. Free-form or legacy values fall back to `Everyone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessType {
    #[default]
    Everyone,
    Users,
    Anonymous,
}

impl AccessType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "users" => AccessType::Users,
            "anonymous" => AccessType::Anonymous,
            _ => AccessType::Everyone,
        }
    }

    /// Reads `accessType` as either a bare string or a CMS parameter object `{ "value": ... }`.
    pub fn from_parameters(parameters: &BTreeMap<String, Value>) -> Self {
        let raw = match parameters.get(ACCESS_TYPE_PARAMETER) {
            Some(Value::String(value)) => Some(value.as_str()),
            Some(Value::Object(parameter)) => parameter.get("value").and_then(Value::as_str),
            _ => None,
        };
        raw.map(Self::parse).unwrap_or_default()
    }
}

/// AccessReason
///
/// Why a decision was reached. Serialized in kebab-case (`requires-auth`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum AccessReason {
    CanvasMode,
    Everyone,
    RequiresAuth,
    AnonymousOnly,
    Authorized,
}

/// AccessDecision
///
/// Stored on each node under `_accessControl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
}

// --- Viewer ---

/// SessionUser
///
/// The identity carried by a session. Opaque to the policy, which only asks
/// whether a session exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionUser {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// SessionSnapshot
///
/// What the session oracle resolved for the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionSnapshot {
    pub user: SessionUser,
}

/// AuthState
///
/// Stored on each node under `_authState`; identical for every node of one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AuthState {
    pub is_authenticated: bool,
    pub user: Option<SessionUser>,
}

/// ViewerContext
///
/// Per-request bundle used to evaluate policy. Built once, after the session
/// lookup has succeeded and the editor mode is known.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewerContext {
    pub is_editor_bypass: bool,
    pub session: Option<SessionSnapshot>,
}

impl ViewerContext {
    pub fn new(is_editor_bypass: bool, session: Option<SessionSnapshot>) -> Self {
        Self {
            is_editor_bypass,
            session,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn auth_state(&self) -> AuthState {
        AuthState {
            is_authenticated: self.is_authenticated(),
            user: self.session.as_ref().map(|session| session.user.clone()),
        }
    }
}

// --- Route Resolution (Content Service Wire Format) ---

/// ReleaseState
///
/// Which content revision to request: drafts while preview is active, published otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseState {
    Published,
    Preview,
}

impl ReleaseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseState::Published => "published",
            ReleaseState::Preview => "preview",
        }
    }
}

/// RouteResolution
///
/// The content service's answer for a route key. Redirects and not-found
/// short-circuit before any access control runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RouteResolution {
    Composition {
        composition: ContentNode,
    },
    Redirect {
        location: String,
        #[serde(default)]
        permanent: bool,
    },
    NotFound,
}

// --- Response Payloads ---

/// PageResponse
///
/// Output of `GET /pages/{route}`: the annotated composition, filtered unless
/// the request is in editor bypass mode.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PageResponse {
    pub route: String,
    pub editor_bypass: bool,
    pub composition: ContentNode,
}
