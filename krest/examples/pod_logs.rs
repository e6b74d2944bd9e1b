use futures::StreamExt;
use krest::{
    api::{Api, LogParams, RetryStrategy},
    core::{ApiResource, DynamicObject, GroupVersionKind, NamespaceSelector},
    Client,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::try_default().await?;
    let pod = std::env::args().nth(1).unwrap_or_else(|| "my-pod".into());

    let ar = ApiResource::from_gvk(&GroupVersionKind::gvk("", "v1", "Pod")).namespaced(true);
    let pods: Api<DynamicObject> = Api::within_with(client, &NamespaceSelector::System, &ar);

    let lp = LogParams::default().timestamps();
    let task = pods.follow_task(&pod, &lp, RetryStrategy::default());
    let mut lines = task.start().boxed();
    while let Some(line) = lines.next().await {
        println!("{}", line?);
    }
    Ok(())
}
