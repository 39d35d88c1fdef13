//! Network operations on a single [`Resource`].
//!
//! Each operation performs at most one request. Local contract violations
//! are reported before anything is sent, and local state is only updated
//! after the server has confirmed the change.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::{json, Map, Value};

use crate::clients::{ApiResponse, ErrorDetail, HttpError, HttpMethod, HttpRequest, ProtocolError};
use crate::resources::errors::ResourceError;
use crate::resources::identity::{
    classify, normalize, IdentifierLike, Linkage, LinkageData, LinkageKind, ResourceIdentifier,
};
use crate::resources::page::Page;
use crate::resources::resource::{Related, Resource};

/// What a redirect pointed at.
#[derive(Clone, Debug)]
pub enum Followed {
    /// A single resource.
    Resource(Box<Resource>),
    /// A collection.
    Page(Page),
}

impl Resource {
    /// Fetches fresh state from the server.
    ///
    /// A `303 See Other` response only records the redirect target (see
    /// [`follow`](Self::follow)); any other response replaces the resource's
    /// state, including related resources from `included`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Http`] if the request fails, or
    /// [`ResourceError::InvalidDocument`] for a malformed response.
    pub async fn reload(&mut self, include: &[&str]) -> Result<(), ResourceError> {
        let mut request = HttpRequest::builder(HttpMethod::Get, self.item_url());
        if !include.is_empty() {
            request = request.query_param("include", include.join(","));
        }
        match self.api.request(request.build()?).await? {
            ApiResponse::Document(document) => self.overwrite(&document),
            response @ ApiResponse::Raw(_) => match response.redirect_location() {
                Some(location) => {
                    tracing::debug!(resource = %self, %location, "Resource is ready to follow");
                    self.redirect = Some(location.to_string());
                    Ok(())
                }
                None => Err(ResourceError::invalid_document(
                    "expected a resource document, got a response without one",
                )),
            },
        }
    }

    fn overwrite(&mut self, document: &Value) -> Result<(), ResourceError> {
        let fresh = Self::from_document(self.api.clone(), self.description.clone(), document)?;
        self.id = fresh.id;
        self.attributes = fresh.attributes;
        self.relationships = fresh.relationships;
        self.related = fresh.related;
        self.links = fresh.links;
        self.redirect = None;
        Ok(())
    }

    /// Loads relationships that are not populated yet.
    ///
    /// To-one relationships are reloaded; to-many relationships get a fresh,
    /// unevaluated [`Page`] over their related collection. Populated
    /// relationships are skipped unless `force` is set, and null ones are
    /// always skipped. When exactly one name is given, its related value is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::UnknownRelationship`] before any request if a
    /// name is not declared, or the error of the failing reload.
    pub async fn fetch(
        &mut self,
        names: &[&str],
        force: bool,
    ) -> Result<Option<&Related>, ResourceError> {
        for name in names {
            self.relationship_entry(name)?;
        }

        for name in names {
            let Some(linkage) = self.relationship_entry(name)?.cloned() else {
                continue;
            };
            let cached = self.related.get(*name).and_then(Option::as_ref);

            match &linkage.data {
                LinkageData::Null => {}
                LinkageData::One(identifier) => {
                    let mut target = match cached {
                        Some(Related::One(resource)) if !force && resource.is_populated() => {
                            continue
                        }
                        Some(Related::One(resource)) if &resource.identifier() == identifier => {
                            (**resource).clone()
                        }
                        _ => self.api.stub(identifier),
                    };
                    target.reload(&[]).await?;
                    self.related
                        .insert((*name).to_string(), Some(Related::One(Box::new(target))));
                }
                LinkageData::Absent | LinkageData::Many(_) => {
                    if !force && matches!(cached, Some(Related::Many(page)) if page.is_evaluated()) {
                        continue;
                    }
                    let url = self.related_url(name, &linkage);
                    self.related.insert(
                        (*name).to_string(),
                        Some(Related::Many(Page::new(self.api.clone(), &url))),
                    );
                }
            }
        }

        match names {
            [name] => Ok(self.get_related(name)),
            _ => Ok(None),
        }
    }

    /// Saves the resource: POST for unsaved resources, PATCH otherwise.
    ///
    /// Written fields are `fields` if given, else the type's editable fields,
    /// else everything that is set. The response is merged back; a cached
    /// to-one related resource survives only if the server kept pointing at
    /// it, and cached pages are left as they are.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Http`] if the request fails.
    pub async fn save(&mut self, fields: &[&str]) -> Result<(), ResourceError> {
        let selection = self.description.writable_fields(fields);

        let mut data = Map::new();
        data.insert("type".to_string(), json!(self.resource_type()));
        if let Some(id) = &self.id {
            data.insert("id".to_string(), json!(id));
        }
        let attributes = self.attributes_payload(selection.as_ref());
        if !attributes.is_empty() {
            data.insert("attributes".to_string(), Value::Object(attributes));
        }
        let relationships = self.relationships_payload(selection.as_ref());
        if !relationships.is_empty() {
            data.insert("relationships".to_string(), Value::Object(relationships));
        }

        let (method, url) = match self.id {
            None => (HttpMethod::Post, self.collection_url()),
            Some(_) => (HttpMethod::Patch, self.item_url()),
        };
        let request = HttpRequest::builder(method, url)
            .json(json!({ "data": data }))
            .build()?;

        match self.api.request(request).await? {
            ApiResponse::Document(document) => self.reconcile(&document),
            ApiResponse::Raw(response) => {
                tracing::debug!(resource = %self, status = response.code, "Save returned no document, keeping local state");
                Ok(())
            }
        }
    }

    /// Merges a save response into this resource.
    fn reconcile(&mut self, document: &Value) -> Result<(), ResourceError> {
        let mut fresh = Self::from_document(self.api.clone(), self.description.clone(), document)?;
        let returned_attributes = document
            .get("data")
            .and_then(|data| data.get("attributes"))
            .is_some();

        // Relationships the response left out keep their linkage and cache
        let mut related = BTreeMap::new();
        for (name, linkage) in std::mem::take(&mut self.relationships) {
            if !fresh.relationships.contains_key(&name) {
                if let Some(cached) = self.related.remove(&name) {
                    related.insert(name.clone(), cached);
                }
                fresh.relationships.insert(name, linkage);
            }
        }

        for (name, cached) in std::mem::take(&mut self.related) {
            let Some(cached) = cached else { continue };
            let Some(linkage) = fresh.relationships.get(&name) else {
                continue;
            };

            match cached {
                Related::Many(page) => {
                    related.insert(name, Some(Related::Many(page)));
                }
                Related::One(resource) => {
                    let new_identifier = linkage.as_ref().and_then(Linkage::identifier);
                    match new_identifier {
                        Some(identifier) if *identifier == resource.identifier() => {
                            related.insert(name, Some(Related::One(resource)));
                        }
                        Some(identifier) => {
                            tracing::trace!(relationship = %name, to = %identifier, "Relationship changed on save");
                            let replacement = match fresh.related.remove(&name) {
                                Some(Some(Related::One(included))) => included,
                                _ => Box::new(self.api.stub(identifier)),
                            };
                            related.insert(name, Some(Related::One(replacement)));
                        }
                        None => {
                            tracing::trace!(relationship = %name, "Relationship cleared on save");
                        }
                    }
                }
            }
        }
        for (name, value) in std::mem::take(&mut fresh.related) {
            related.entry(name).or_insert(value);
        }

        self.id = fresh.id;
        if returned_attributes {
            self.attributes = fresh.attributes;
        }
        self.relationships = fresh.relationships;
        self.related = related;
        self.links = fresh.links;
        Ok(())
    }

    /// Deletes the resource on the server and clears its id.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Http`] if the request fails. Deleting an
    /// already-deleted resource targets `/{type}/` and fails server-side.
    pub async fn delete(&mut self) -> Result<(), ResourceError> {
        let request = HttpRequest::builder(HttpMethod::Delete, self.item_url()).build()?;
        self.api.request(request).await?;
        tracing::debug!(resource = %self, "Resource deleted");
        self.id = None;
        Ok(())
    }

    /// Changes a to-one relationship on the server.
    ///
    /// Sends one PATCH to the relationship endpoint, then updates the local
    /// linkage and related cache without re-fetching.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::UnknownRelationship`] if `field` is not declared
    /// - [`ResourceError::PluralRelationship`] if `field` is to-many
    /// - [`ResourceError::Http`] if the request fails
    pub async fn change(
        &mut self,
        field: &str,
        value: Option<IdentifierLike>,
    ) -> Result<(), ResourceError> {
        let linkage = self.relationship_entry(field)?.cloned();
        if classify(linkage.as_ref()) == LinkageKind::Plural {
            return Err(ResourceError::PluralRelationship {
                name: field.to_string(),
            });
        }

        let value = value.filter(|value| !value.is_null());
        let identifier = match &value {
            Some(value) => {
                let default_type = linkage.as_ref().and_then(Linkage::data_type);
                Some(normalize(value, default_type)?)
            }
            None => None,
        };

        let url = self.relationship_url(field, linkage.as_ref())?;
        let data = identifier
            .as_ref()
            .map_or(Value::Null, ResourceIdentifier::to_value);
        let request = HttpRequest::builder(HttpMethod::Patch, url)
            .json(json!({ "data": data }))
            .build()?;
        self.api.request(request).await?;

        let cached = match (value, &identifier) {
            (Some(value), Some(identifier)) => Some(self.bind_value(value, identifier)),
            _ => None,
        };
        let links = linkage.map(|linkage| linkage.links).unwrap_or_default();
        let data = identifier.map_or(LinkageData::Null, LinkageData::One);
        self.relationships
            .insert(field.to_string(), Some(Linkage { data, links }));
        self.related.insert(
            field.to_string(),
            cached.map(|resource| Related::One(Box::new(resource))),
        );
        Ok(())
    }

    /// Adds members to a to-many relationship (POST).
    ///
    /// The related cache is left as is; use `fetch(&[field], true)` to see
    /// the new membership.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::UnknownRelationship`] if `field` is not declared
    /// - [`ResourceError::SingularRelationship`] if `field` is to-one
    /// - [`ResourceError::Http`] if the request fails
    pub async fn add(&mut self, field: &str, values: &[IdentifierLike]) -> Result<(), ResourceError> {
        self.edit_members(HttpMethod::Post, field, values).await
    }

    /// Removes members from a to-many relationship (DELETE).
    ///
    /// # Errors
    ///
    /// Same as [`add`](Self::add).
    pub async fn remove(
        &mut self,
        field: &str,
        values: &[IdentifierLike],
    ) -> Result<(), ResourceError> {
        self.edit_members(HttpMethod::Delete, field, values).await
    }

    /// Replaces all members of a to-many relationship (PATCH).
    ///
    /// # Errors
    ///
    /// Same as [`add`](Self::add).
    pub async fn reset(
        &mut self,
        field: &str,
        values: &[IdentifierLike],
    ) -> Result<(), ResourceError> {
        self.edit_members(HttpMethod::Patch, field, values).await
    }

    async fn edit_members(
        &self,
        method: HttpMethod,
        field: &str,
        values: &[IdentifierLike],
    ) -> Result<(), ResourceError> {
        let linkage = self.relationship_entry(field)?;
        if classify(linkage) != LinkageKind::Plural {
            return Err(ResourceError::SingularRelationship {
                name: field.to_string(),
            });
        }

        let default_type = linkage.and_then(Linkage::data_type);
        let data = values
            .iter()
            .map(|value| normalize(value, default_type).map(|identifier| identifier.to_value()))
            .collect::<Result<Vec<_>, _>>()?;

        let url = self.relationship_url(field, linkage)?;
        let request = HttpRequest::builder(method, url)
            .json(json!({ "data": data }))
            .build()?;
        self.api.request(request).await?;
        Ok(())
    }

    /// The relationship endpoint: the linkage's `self` link, else
    /// `/{type}/{id}/relationships/{field}`.
    fn relationship_url(&self, field: &str, linkage: Option<&Linkage>) -> Result<String, ResourceError> {
        if let Some(url) = linkage.and_then(|linkage| linkage.link("self")) {
            return Ok(url.to_string());
        }
        let id = self.id.as_deref().ok_or_else(|| ResourceError::Unsaved {
            resource_type: self.resource_type().to_string(),
        })?;
        Ok(format!(
            "/{}/{id}/relationships/{field}",
            self.resource_type()
        ))
    }

    /// Fetches whatever a previous reload was redirected to.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::NotRedirected`] if there is no pending
    /// redirect, [`ResourceError::InvalidDocument`] if the target is neither
    /// a resource nor a collection.
    pub async fn follow(&self) -> Result<Followed, ResourceError> {
        let url = self.redirect.clone().ok_or(ResourceError::NotRedirected)?;
        let request = HttpRequest::builder(HttpMethod::Get, url.clone()).build()?;
        let ApiResponse::Document(document) = self.api.request(request).await? else {
            return Err(ResourceError::invalid_document(
                "redirect target returned no document",
            ));
        };
        match document.get("data") {
            Some(Value::Array(_)) => Ok(Followed::Page(Page::from_document(
                self.api.clone(),
                &url,
                &document,
            )?)),
            Some(Value::Object(_)) => Ok(Followed::Resource(Box::new(self.api.decode(&document)?))),
            _ => Err(ResourceError::invalid_document(
                "redirect target is neither a resource nor a collection",
            )),
        }
    }

    /// Polls a server-side job until it redirects, then follows the redirect.
    ///
    /// Each round checks the `errors` attribute first, then the pending
    /// redirect; otherwise it sleeps for `interval` and reloads. Jobs that
    /// never finish keep this future pending, so wrap it in a timeout if
    /// that matters.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Http`] with a `409` [`ProtocolError`] built
    /// from a non-empty `errors` attribute, or the error of a failing reload
    /// or [`follow`](Self::follow).
    pub async fn wait_until_redirect(&mut self, interval: Duration) -> Result<Followed, ResourceError> {
        loop {
            if let Some(error) = self.job_errors() {
                tracing::warn!(resource = %self, errors = error.errors.len(), "Job failed");
                return Err(HttpError::from(error).into());
            }
            if self.redirect.is_some() {
                return self.follow().await;
            }
            tracing::trace!(resource = %self, ?interval, "Job pending");
            tokio::time::sleep(interval).await;
            self.reload(&[]).await?;
        }
    }

    /// The job's `errors` attribute as a conflict, if it has any entries.
    fn job_errors(&self) -> Option<ProtocolError> {
        let entries = self.attributes.get("errors")?.as_array()?;
        if entries.is_empty() {
            return None;
        }
        let errors = entries
            .iter()
            .map(|entry| {
                let mut error = serde_json::from_value::<ErrorDetail>(entry.clone())
                    .unwrap_or_else(|_| ErrorDetail {
                        detail: Some(entry.as_str().map_or_else(|| entry.to_string(), str::to_string)),
                        ..ErrorDetail::default()
                    });
                if error.title.is_none() {
                    error.title = error.detail.clone();
                }
                error.status = Some("409".to_string());
                error
            })
            .collect();
        Some(ProtocolError {
            status_code: 409,
            errors,
        })
    }
}
