// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resolution of actor and subject references.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::AuditResult;
use crate::event::{EntityKind, EntityRef};

/// Display name used for the system actor.
pub const SYSTEM_ACTOR_NAME: &str = "System";

/// Looks up entities referenced by audit events.
#[async_trait]
pub trait EntityDirectory: Send + Sync {
	/// Display name of an actor, or `None` if it does not resolve.
	async fn display_name(&self, actor: &EntityRef) -> AuditResult<Option<String>>;

	/// Whether the referenced entity currently exists.
	async fn exists(&self, entity: &EntityRef) -> AuditResult<bool>;
}

/// A directory backed by an in-process table. The system actor always
/// resolves.
#[derive(Debug, Default)]
pub struct StaticEntityDirectory {
	names: RwLock<HashMap<EntityRef, String>>,
	entities: RwLock<HashSet<EntityRef>>,
}

impl StaticEntityDirectory {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_user(mut self, id: i64, name: impl Into<String>) -> Self {
		let actor = EntityRef::user(id);
		self.names.get_mut().insert(actor, name.into());
		self.entities.get_mut().insert(actor);
		self
	}

	pub fn with_entity(mut self, entity: EntityRef) -> Self {
		self.entities.get_mut().insert(entity);
		self
	}

	pub async fn insert_user(&self, id: i64, name: impl Into<String>) {
		let actor = EntityRef::user(id);
		self.names.write().await.insert(actor, name.into());
		self.entities.write().await.insert(actor);
	}

	pub async fn insert_entity(&self, entity: EntityRef) {
		self.entities.write().await.insert(entity);
	}

	pub async fn remove_entity(&self, entity: &EntityRef) {
		self.entities.write().await.remove(entity);
		self.names.write().await.remove(entity);
	}
}

#[async_trait]
impl EntityDirectory for StaticEntityDirectory {
	async fn display_name(&self, actor: &EntityRef) -> AuditResult<Option<String>> {
		if actor.kind == EntityKind::System {
			return Ok(Some(SYSTEM_ACTOR_NAME.to_string()));
		}
		Ok(self.names.read().await.get(actor).cloned())
	}

	async fn exists(&self, entity: &EntityRef) -> AuditResult<bool> {
		if entity.kind == EntityKind::System {
			return Ok(true);
		}
		Ok(self.entities.read().await.contains(entity))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn system_always_resolves() {
		let directory = StaticEntityDirectory::new();
		assert_eq!(
			directory.display_name(&EntityRef::system()).await.unwrap(),
			Some("System".to_string())
		);
		assert!(directory.exists(&EntityRef::system()).await.unwrap());
	}

	#[tokio::test]
	async fn unknown_references_do_not_resolve() {
		let directory = StaticEntityDirectory::new().with_user(7, "Ana Reyes");
		assert!(directory
			.display_name(&EntityRef::user(8))
			.await
			.unwrap()
			.is_none());
		assert!(!directory
			.exists(&EntityRef::new(EntityKind::Project, 42))
			.await
			.unwrap());
	}

	#[tokio::test]
	async fn entities_can_be_added_and_removed() {
		let project = EntityRef::new(EntityKind::Project, 42);
		let directory = StaticEntityDirectory::new().with_entity(project);
		assert!(directory.exists(&project).await.unwrap());

		directory.remove_entity(&project).await;
		assert!(!directory.exists(&project).await.unwrap());

		directory.insert_user(3, "Ben Cruz").await;
		assert_eq!(
			directory.display_name(&EntityRef::user(3)).await.unwrap(),
			Some("Ben Cruz".to_string())
		);
	}
}
