use either::Either;
use futures::Stream;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

use crate::{api::Api, Error, Result};
use krest_core::{
    api_resource::verbs, object::ObjectList, params::*, response::Status, watch::WatchEvent, Resource,
};

/// The collection and item verbs available on every readable kind
impl<K> Api<K>
where
    K: Clone + DeserializeOwned + Debug,
{
    /// Fetch one named object, failing when it does not exist.
    ///
    /// For objects that may legitimately be absent, prefer
    /// [`Api::get_opt`].
    ///
    /// ```no_run
    /// # use krest_client::{Api, Client};
    /// # use krest_core::{ApiResource, DynamicObject, GroupVersionKind};
    /// # async fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
    /// # let client: Client = todo!();
    /// let ar = ApiResource::from_gvk(&GroupVersionKind::gvk("", "v1", "Pod")).namespaced(true);
    /// let pods: Api<DynamicObject> = Api::namespaced_with(client, "apps", &ar);
    /// let blog = pods.get("blog").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get(&self, name: &str) -> Result<K> {
        self.get_with(name, &GetParams::default()).await
    }

    /// [`Api::get`] with explicit read options.
    pub async fn get_with(&self, name: &str, gp: &GetParams) -> Result<K> {
        self.check_verb(verbs::GET)?;
        let mut req = self.request.get(name, gp).map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("get");
        self.client.request::<K>(req).await
    }

    /// Fetch one named object, mapping a `NotFound` answer to `None`.
    pub async fn get_opt(&self, name: &str) -> Result<Option<K>> {
        match self.get(name).await {
            Ok(obj) => Ok(Some(obj)),
            Err(Error::Api(Status { reason, .. })) if &reason == "NotFound" => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// List the collection, optionally narrowed by selectors and paging.
    ///
    /// ```no_run
    /// # use krest_client::{Api, Client};
    /// use krest_client::api::{Expression, ListParams, ResourceExt};
    /// # use krest_core::{ApiResource, DynamicObject, GroupVersionKind};
    /// # async fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
    /// # let client: Client = todo!();
    /// # let ar = ApiResource::from_gvk(&GroupVersionKind::gvk("", "v1", "Pod")).namespaced(true);
    /// let pods: Api<DynamicObject> = Api::namespaced_with(client, "apps", &ar);
    /// let mine = ListParams::default().labels(Expression::Equal("app".into(), "blog".into()));
    /// for pod in pods.list(&mine).await? {
    ///     println!("found {}", pod.name_any());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn list(&self, lp: &ListParams) -> Result<ObjectList<K>> {
        self.check_verb(verbs::LIST)?;
        let mut req = self.request.list(lp).map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("list");
        self.client.request::<ObjectList<K>>(req).await
    }

    /// Create an object in the collection.
    ///
    /// The name travels in the payload, never in the url: `metadata.name`
    /// (or `generateName`) must be set or the call is rejected before it
    /// reaches the server.
    pub async fn create(&self, pp: &PostParams, data: &K) -> Result<K>
    where
        K: Serialize + Resource,
    {
        self.check_verb(verbs::CREATE)?;
        let meta = data.meta();
        if meta.name.is_none() && meta.generate_name.is_none() {
            return Err(Error::RequestValidation(
                "create requires metadata.name or metadata.generateName".into(),
            ));
        }
        let bytes = serde_json::to_vec(&data).map_err(Error::SerdeError)?;
        let mut req = self.request.create(pp, bytes).map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("create");
        self.client.request::<K>(req).await
    }

    /// Replace an object wholesale.
    ///
    /// The server rejects a replace whose `metadata.resourceVersion` does
    /// not match the live object, so the usual shape is fetch, mutate,
    /// replace.
    pub async fn replace(&self, name: &str, pp: &PostParams, data: &K) -> Result<K>
    where
        K: Serialize,
    {
        self.check_verb(verbs::UPDATE)?;
        let bytes = serde_json::to_vec(&data).map_err(Error::SerdeError)?;
        let mut req = self
            .request
            .replace(name, pp, bytes)
            .map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("replace");
        self.client.request::<K>(req).await
    }

    /// Patch an object with a pre-built patch body.
    ///
    /// The body in the [`Patch`] goes to the server as-is; nothing here
    /// diffs or merges.
    pub async fn patch<P: Serialize + Debug>(
        &self,
        name: &str,
        pp: &PatchParams,
        patch: &Patch<P>,
    ) -> Result<K> {
        self.check_verb(verbs::PATCH)?;
        let mut req = self.request.patch(name, pp, patch).map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("patch");
        self.client.request::<K>(req).await
    }

    /// Delete one named object.
    ///
    /// `Left(K)` means the delete is underway and this is the object's last
    /// state; `Right(Status)` is the server's confirmation envelope. Error
    /// statuses (including a 404 for an already-gone object) arrive as
    /// [`Error::Api`].
    pub async fn delete(&self, name: &str, dp: &DeleteParams) -> Result<Either<K, Status>>
    where
        K: 'static,
    {
        self.check_verb(verbs::DELETE)?;
        let mut req = self.request.delete(name, dp).map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("delete");
        self.client.request_status::<K>(req).await
    }

    /// Delete everything in the collection that the list params select.
    ///
    /// `Left` carries the objects whose deletion began; `Right` the
    /// server's confirmation envelope.
    pub async fn delete_collection(
        &self,
        dp: &DeleteParams,
        lp: &ListParams,
    ) -> Result<Either<ObjectList<K>, Status>>
    where
        K: 'static,
    {
        self.check_verb(verbs::DELETE_COLLECTION)?;
        let mut req = self
            .request
            .delete_collection(dp, lp)
            .map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("delete_collection");
        self.client.request_status::<ObjectList<K>>(req).await
    }

    /// Open one watch connection on the collection.
    ///
    /// The returned stream lives exactly as long as the underlying
    /// connection, which the server may end at any point; re-issue the
    /// watch from the last seen `resourceVersion` to continue. A managed,
    /// reconnecting alternative is [`Api::watch_task`](crate::api::WatchTask).
    pub async fn watch(&self, lp: &ListParams) -> Result<impl Stream<Item = Result<WatchEvent<K>>>> {
        self.check_verb(verbs::WATCH)?;
        let mut req = self.request.watch(lp).map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("watch");
        self.client.request_events::<K>(req).await
    }
}
