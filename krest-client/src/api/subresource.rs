use bytes::Bytes;
use futures::{Stream, TryStream};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

use crate::{
    api::{Api, Patch, PatchParams, PostParams},
    Error, Result,
};

use krest_core::subresource::{LogParams, Scale};

/// The [scale subresource](https://kubernetes.io/docs/tasks/access-kubernetes-api/custom-resources/custom-resource-definitions/#scale-subresource): replica counts without the full object.
impl<K> Api<K>
where
    K: Clone + DeserializeOwned,
{
    /// Read an object's current and desired scale
    pub async fn get_scale(&self, name: &str) -> Result<Scale> {
        self.check_subresource("scale")?;
        let mut req = self
            .request
            .get_subresource("scale", name)
            .map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("get_scale");
        self.client.request::<Scale>(req).await
    }

    /// Set an object's desired scale
    pub async fn replace_scale(&self, name: &str, pp: &PostParams, data: &Scale) -> Result<Scale> {
        self.check_subresource("scale")?;
        let bytes = serde_json::to_vec(data).map_err(Error::SerdeError)?;
        let mut req = self
            .request
            .replace_subresource("scale", name, pp, bytes)
            .map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("replace_scale");
        self.client.request::<Scale>(req).await
    }

    /// Patch an object's scale with a pre-built patch body
    pub async fn patch_scale<P: Serialize + Debug>(
        &self,
        name: &str,
        pp: &PatchParams,
        patch: &Patch<P>,
    ) -> Result<Scale> {
        self.check_subresource("scale")?;
        let mut req = self
            .request
            .patch_subresource("scale", name, pp, patch)
            .map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("patch_scale");
        self.client.request::<Scale>(req).await
    }
}

/// The [status subresource](https://kubernetes.io/docs/tasks/access-kubernetes-api/custom-resources/custom-resource-definitions/#status-subresource): the controller-owned half of an object.
impl<K> Api<K>
where
    K: DeserializeOwned,
{
    /// Read through the status endpoint
    ///
    /// Answers with the whole object, not just its `.status`.
    pub async fn get_status(&self, name: &str) -> Result<K> {
        self.check_subresource("status")?;
        let mut req = self
            .request
            .get_subresource("status", name)
            .map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("get_status");
        self.client.request::<K>(req).await
    }

    /// Replace the status block from a pre-serialized object
    ///
    /// The write only lands on `.status`; a `.spec` in the payload is
    /// ignored and may be omitted.
    pub async fn replace_status(&self, name: &str, pp: &PostParams, data: Vec<u8>) -> Result<K> {
        self.check_subresource("status")?;
        let mut req = self
            .request
            .replace_subresource("status", name, pp, data)
            .map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("replace_status");
        self.client.request::<K>(req).await
    }

    /// Patch status fields with a pre-built patch body
    ///
    /// Only meaningful on kinds that serve a status subresource.
    pub async fn patch_status<P: Serialize + Debug>(
        &self,
        name: &str,
        pp: &PatchParams,
        patch: &Patch<P>,
    ) -> Result<K> {
        self.check_subresource("status")?;
        let mut req = self
            .request
            .patch_subresource("status", name, pp, patch)
            .map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("patch_status");
        self.client.request::<K>(req).await
    }
}

// ----------------------------------------------------------------------------
// Log subresource
// ----------------------------------------------------------------------------

/// Marker for kinds that serve the log subresource (pods)
pub trait Log {}

impl Log for krest_core::DynamicObject {}

impl<K> Api<K>
where
    K: DeserializeOwned + Log,
{
    /// One log snapshot, collected into a string
    pub async fn logs(&self, name: &str, lp: &LogParams) -> Result<String> {
        self.check_subresource("log")?;
        let mut req = self.request.logs(name, lp).map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("logs");
        self.client.request_plaintext(req).await
    }

    /// The raw log byte stream, chunked as the server sends it
    pub async fn log_stream(&self, name: &str, lp: &LogParams) -> Result<impl Stream<Item = Result<Bytes>>> {
        self.check_subresource("log")?;
        let mut req = self.request.logs(name, lp).map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("log_stream");
        self.client.request_text_stream(req).await
    }

    /// The log as a stream of records, one per `\n`-terminated line
    ///
    /// Blank records are skipped. Ordering holds within one container;
    /// nothing is promised across containers.
    pub async fn log_lines(&self, name: &str, lp: &LogParams) -> Result<impl TryStream<Item = Result<String>>> {
        self.check_subresource("log")?;
        let mut req = self.request.logs(name, lp).map_err(Error::BuildRequest)?;
        req.extensions_mut().insert("log_lines");
        self.client.request_log_lines(req).await
    }
}
