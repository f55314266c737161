use uvimage_docker::DockerClient;

pub async fn doctor(program: &str) -> anyhow::Result<()> {
    let client = DockerClient::with_program(program);
    let report = client.doctor().await;

    println!();
    println!("{report}");

    if !report.all_passed() {
        anyhow::bail!("some checks failed — see above for details");
    }

    Ok(())
}
