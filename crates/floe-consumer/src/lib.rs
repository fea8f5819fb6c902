//! Client-side executor of the floe protocol: the [`Transport`] collaborator
//! boundary, the deterministic status mapping, the JSON wire codec, and the
//! [`Consumer`] request executor mirroring the producer surface one-to-one.

pub mod payload;
pub mod transport;


pub use transport::{
    OpKind, Transport, TransportError, TransportRequest, TransportResponse, status_to_error,
};

use floe_core::{
    entity::{Entity, EntityRef},
    error::{Error, ErrorKind, ErrorOrigin, TransportKind},
    key::{EntityKey, codec},
    method::Method,
    model::{EdmModel, EntityTypeModel, Multiplicity},
    path::{PathSegment, ResourcePath},
    query::QueryInfo,
    response::{EntityCollection, Envelope, Links},
};
use tracing::debug;

const LINKS_SEGMENT: &str = "$links";

///
/// Consumer
///
/// Client-side mirror of the producer surface. Every operation validates its
/// addressing locally, builds the canonical path and query string, selects
/// the method and body, hands the request to the injected transport, and
/// decodes the raw response — or maps its status — into the shared
/// taxonomy. Addressing failures never reach the transport.
///

pub struct Consumer {
    service_root: String,
    model: EdmModel,
    transport: Box<dyn Transport>,
}

impl Consumer {
    #[must_use]
    pub fn new(
        service_root: impl Into<String>,
        model: EdmModel,
        transport: Box<dyn Transport>,
    ) -> Self {
        let mut service_root = service_root.into();
        if !service_root.ends_with('/') {
            service_root.push('/');
        }

        Self {
            service_root,
            model,
            transport,
        }
    }

    #[must_use]
    pub fn metadata(&self) -> &EdmModel {
        &self.model
    }

    #[must_use]
    pub fn service_root(&self) -> &str {
        &self.service_root
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn get_entities(&self, set: &str, query: &QueryInfo) -> Result<EntityCollection, Error> {
        let ty = self.model.type_for_set(set)?;

        let url = self.url_for(&ResourcePath::collection(set), query);
        let response = self.send(Method::Get, url, None, OpKind::CollectionRead)?;

        payload::decode_collection(&require_body(&response)?, ty)
    }

    pub fn get_entity(&self, set: &str, key: &EntityKey, query: &QueryInfo) -> Result<Entity, Error> {
        let ty = self.model.type_for_set(set)?;
        let key = canonical_key(ty, key)?;

        let url = self.url_for(&ResourcePath::entity(set, key), query);
        let response = self.send(Method::Get, url, None, OpKind::EntityAccess)?;

        payload::decode_entity(&require_body(&response)?, ty)
    }

    /// Follow a navigation or structural property; the expected envelope
    /// variant comes from the declared target, so a to-one navigation is
    /// decoded as an entity and a to-many one as a collection.
    pub fn get_nav_property(
        &self,
        set: &str,
        key: &EntityKey,
        nav: &str,
        query: &QueryInfo,
    ) -> Result<Envelope, Error> {
        let ty = self.model.type_for_set(set)?;
        let key = canonical_key(ty, key)?;
        let path = ResourcePath::entity(set, key).hop(nav);

        if ty.property(nav).is_some() {
            let url = self.url_for(&path, query);
            let response = self.send(Method::Get, url, None, OpKind::EntityAccess)?;

            return payload::decode_property(&require_body(&response)?, nav, ty)
                .map(Envelope::Property);
        }

        let nav_model = self
            .model
            .resolve_navigation(set, nav)?;
        let target_ty = self.model.type_for_set(&nav_model.target_set)?;
        let multiplicity = nav_model.multiplicity;

        let url = self.url_for(&path, query);
        let response = self.send(Method::Get, url, None, OpKind::EntityAccess)?;
        let body = require_body(&response)?;

        if multiplicity.is_single() {
            payload::decode_entity(&body, target_ty).map(Envelope::Entity)
        } else {
            payload::decode_collection(&body, target_ty).map(Envelope::Collection)
        }
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    pub fn create_entity(&self, set: &str, entity: Entity) -> Result<Entity, Error> {
        let ty = self.model.type_for_set(set)?;

        let url = self.url_for(&ResourcePath::collection(set), &QueryInfo::new());
        let body = payload::encode_entity(&entity);
        let response = self.send(Method::Post, url, Some(body), OpKind::EntityAccess)?;

        payload::decode_entity(&require_body(&response)?, ty)
    }

    pub fn create_related(
        &self,
        set: &str,
        key: &EntityKey,
        nav: &str,
        entity: Entity,
    ) -> Result<Entity, Error> {
        let ty = self.model.type_for_set(set)?;
        let key = canonical_key(ty, key)?;
        let nav_model = self.model.resolve_navigation(set, nav)?;
        let target_ty = self.model.type_for_set(&nav_model.target_set)?;

        let url = self.url_for(&ResourcePath::entity(set, key).hop(nav), &QueryInfo::new());
        let body = payload::encode_entity(&entity);
        let response = self.send(Method::Post, url, Some(body), OpKind::EntityAccess)?;

        payload::decode_entity(&require_body(&response)?, target_ty)
    }

    /// Delete one entity. Success has no payload; the only observable
    /// effects are the transport's side effect and the absence of a failure.
    pub fn delete_entity(&self, set: &str, key: &EntityKey) -> Result<(), Error> {
        let ty = self.model.type_for_set(set)?;
        let key = canonical_key(ty, key)?;

        let url = self.url_for(&ResourcePath::entity(set, key), &QueryInfo::new());
        self.send(Method::Delete, url, None, OpKind::EntityAccess)?;

        Ok(())
    }

    /// Merge semantics; the payload carries its key properties.
    pub fn merge_entity(&self, set: &str, entity: Entity) -> Result<(), Error> {
        self.write_entity(Method::Merge, set, entity)
    }

    /// Update (replace) semantics; the payload carries its key properties.
    pub fn update_entity(&self, set: &str, entity: Entity) -> Result<(), Error> {
        self.write_entity(Method::Put, set, entity)
    }

    fn write_entity(&self, method: Method, set: &str, entity: Entity) -> Result<(), Error> {
        let ty = self.model.type_for_set(set)?;
        let key = ty.entity_key(&entity)?;

        let url = self.url_for(&ResourcePath::entity(set, key), &QueryInfo::new());
        let body = payload::encode_entity(&entity);
        self.send(method, url, Some(body), OpKind::EntityAccess)?;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Links
    // ------------------------------------------------------------------

    pub fn get_links(&self, source: &EntityRef, nav: &str) -> Result<Links, Error> {
        let multiplicity = self.check_link_address(source, nav, None, false)?;

        let url = self.links_url(source, nav, None);
        let response = self.send(Method::Get, url, None, OpKind::LinkAccess)?;

        payload::decode_links(
            &require_body(&response)?,
            &self.service_root,
            &self.model,
            multiplicity.is_single(),
        )
    }

    pub fn create_link(
        &self,
        source: &EntityRef,
        nav: &str,
        target: &EntityRef,
    ) -> Result<(), Error> {
        self.check_link_address(source, nav, None, false)?;

        let url = self.links_url(source, nav, None);
        let body = payload::encode_ref(&self.service_root, target);
        self.send(Method::Post, url, Some(body), OpKind::LinkAccess)?;

        Ok(())
    }

    pub fn update_link(
        &self,
        source: &EntityRef,
        nav: &str,
        old_target_key: Option<&EntityKey>,
        target: &EntityRef,
    ) -> Result<(), Error> {
        self.check_link_address(source, nav, old_target_key, true)?;

        let url = self.links_url(source, nav, old_target_key);
        let body = payload::encode_ref(&self.service_root, target);
        self.send(Method::Put, url, Some(body), OpKind::LinkAccess)?;

        Ok(())
    }

    pub fn delete_link(
        &self,
        source: &EntityRef,
        nav: &str,
        target_key: Option<&EntityKey>,
    ) -> Result<(), Error> {
        self.check_link_address(source, nav, target_key, true)?;

        let url = self.links_url(source, nav, target_key);
        self.send(Method::Delete, url, None, OpKind::LinkAccess)?;

        Ok(())
    }

    /// Local link-address validation: the navigation must be declared, and
    /// the disambiguation key is required on collection-valued properties
    /// and forbidden on to-one ones.
    fn check_link_address(
        &self,
        source: &EntityRef,
        nav: &str,
        key: Option<&EntityKey>,
        keyed_op: bool,
    ) -> Result<Multiplicity, Error> {
        let source_ty = self.model.type_for_set(&source.entity_set)?;
        canonical_key(source_ty, &source.key)?;
        let nav_model = self.model.resolve_navigation(&source.entity_set, nav)?;

        if keyed_op {
            if nav_model.multiplicity.is_single() && key.is_some() {
                return Err(Error::new(
                    ErrorKind::InvalidPath,
                    ErrorOrigin::Consumer,
                    format!("link operation on to-one '{nav}' does not take a target key"),
                ));
            }
            if !nav_model.multiplicity.is_single() && key.is_none() {
                return Err(Error::new(
                    ErrorKind::InvalidPath,
                    ErrorOrigin::Consumer,
                    format!("link operation on collection-valued '{nav}' requires a target key"),
                ));
            }
        }

        Ok(nav_model.multiplicity)
    }

    // ------------------------------------------------------------------
    // Request plumbing
    // ------------------------------------------------------------------

    fn url_for(&self, path: &ResourcePath, query: &QueryInfo) -> String {
        let mut url = format!("{}{}", self.service_root, escape_path(path));

        let query_string = query.to_query_string();
        if !query_string.is_empty() {
            url.push('?');
            url.push_str(&query_string);
        }

        url
    }

    fn links_url(&self, source: &EntityRef, nav: &str, key: Option<&EntityKey>) -> String {
        let mut url = format!(
            "{}{}/{LINKS_SEGMENT}/{nav}",
            self.service_root,
            escape_path(&source.to_path())
        );
        if let Some(key) = key {
            url.push('(');
            url.push_str(&urlencoding::encode(&codec::encode(key)));
            url.push(')');
        }

        url
    }

    fn send(
        &self,
        method: Method,
        url: String,
        body: Option<String>,
        op: OpKind,
    ) -> Result<TransportResponse, Error> {
        debug!(%method, url, "sending request");

        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        let response = self
            .transport
            .send(TransportRequest {
                method,
                url,
                headers,
                body,
            })
            .map_err(Error::from)?;

        if !response.is_success() {
            return Err(status_to_error(response.status, op));
        }

        Ok(response)
    }
}

/// Render a path with percent-escaped key literals.
fn escape_path(path: &ResourcePath) -> String {
    let mut out = String::new();
    for segment in path.segments() {
        match segment {
            PathSegment::Set(name) => out.push_str(name),
            PathSegment::Key(key) => {
                out.push('(');
                out.push_str(&urlencoding::encode(&codec::encode(key)));
                out.push(')');
            }
            PathSegment::Nav(name) => {
                out.push('/');
                out.push_str(name);
            }
        }
    }

    out
}

/// Validate a caller-supplied key against the type's shape, returning the
/// canonicalized form used for addressing.
fn canonical_key(ty: &EntityTypeModel, key: &EntityKey) -> Result<EntityKey, Error> {
    let shape = ty.key_shape();

    let canonical = match key {
        EntityKey::Single(value) => shape.key_from_value(value.clone())?,
        EntityKey::Composite(pairs) => shape.key_from_pairs(pairs.clone())?,
    };

    Ok(canonical)
}

fn require_body(response: &TransportResponse) -> Result<String, Error> {
    response.body.clone().ok_or_else(|| {
        Error::new(
            ErrorKind::Transport(TransportKind::Payload),
            ErrorOrigin::Consumer,
            "response had no body to decode",
        )
    })
}
