use futures::StreamExt;
use krest::{
    api::{Api, ListParams, RetryStrategy, WatchEvent},
    core::{ApiResource, DynamicObject, GroupVersionKind},
    Client,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::try_default().await?;

    let ar = ApiResource::from_gvk(&GroupVersionKind::gvk("", "v1", "Pod")).namespaced(true);
    let pods: Api<DynamicObject> = Api::default_namespaced_with(client, &ar);

    // Reconnects on stream drops until the strategy is exhausted
    let task = pods.watch_task(&ListParams::default(), RetryStrategy::default());
    let mut events = task.start().boxed();
    while let Some(event) = events.next().await {
        match event? {
            WatchEvent::Added(o) => println!("added: {:?}", o.metadata.name),
            WatchEvent::Modified(o) => println!("modified: {:?}", o.metadata.name),
            WatchEvent::Deleted(o) => println!("deleted: {:?}", o.metadata.name),
            WatchEvent::Error(status) => println!("watch error: {status}"),
        }
    }
    Ok(())
}
