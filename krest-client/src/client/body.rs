//! Adapters between `http_body::Body` implementations and `Stream`s.
use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::stream::Stream;
use http_body::Body as HttpBody;
use pin_project::pin_project;

/// Wrap an `http_body::Body` to implement `Stream` over its data frames.
#[pin_project]
pub struct BodyStream<B> {
    #[pin]
    body: B,
}

impl<B> BodyStream<B> {
    pub(crate) fn new(body: B) -> Self {
        Self { body }
    }
}

impl<B> Stream for BodyStream<B>
where
    B: HttpBody,
{
    type Item = Result<B::Data, B::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().body.poll_data(cx)
    }
}

// Add `into_stream()` to `http_body::Body`
pub(crate) trait BodyStreamExt: HttpBody {
    fn into_stream(self) -> BodyStream<Self>
    where
        Self: Sized,
    {
        BodyStream::new(self)
    }
}

impl<T> BodyStreamExt for T where T: HttpBody {}
