//! Integration Test: オーケストレーター
//!
//! 複数モックサーバーへのタスク分散、入力順の保持、JSONダンプの検証

use std::time::Duration;

use ollama_dispatch::machine::{Machine, Worker};
use ollama_dispatch::orchestrator::{Dispatcher, Orchestrator};
use ollama_dispatch::{
    DispatchConfig, DispatchError, Endpoint, GenerateRequest, ResponseAnnotations,
};

use crate::support::ollama::MockOllamaServer;

fn config_for(servers: &[&MockOllamaServer], dump_dir: Option<&std::path::Path>) -> DispatchConfig {
    DispatchConfig {
        endpoints: servers
            .iter()
            .map(|s| Endpoint::new(s.name.clone(), s.uri()))
            .collect(),
        request_timeout_secs: Some(10),
        dump_dir: dump_dir.map(|d| d.to_path_buf()),
        show_progress: false,
    }
}

fn tasks(count: usize) -> Vec<GenerateRequest> {
    (0..count)
        .map(|i| {
            GenerateRequest::new("llama3", format!("prompt-{}", i))
                .with_annotations(ResponseAnnotations::tagged(format!("q{}", i), "flow"))
        })
        .collect()
}

#[tokio::test]
async fn test_results_follow_input_order_across_machines() {
    let gpu_a = MockOllamaServer::start("gpu-a").await;
    let gpu_b = MockOllamaServer::start("gpu-b").await;

    // 先頭タスクだけ大きく遅延させる
    for server in [&gpu_a, &gpu_b] {
        for i in 0..5 {
            let delay = if i == 0 {
                Duration::from_millis(400)
            } else {
                Duration::ZERO
            };
            server
                .reply_to(&format!("prompt-{}", i), &format!("answer-{}", i), delay)
                .await;
        }
    }

    let dump_dir = tempfile::tempdir().unwrap();
    let config = config_for(&[&gpu_a, &gpu_b], Some(dump_dir.path()));
    let orchestrator = Orchestrator::<Machine>::from_config(&config).unwrap();

    let results = orchestrator.run(tasks(5)).await.unwrap();

    let answers: Vec<&str> = results.iter().map(|r| r.response.as_str()).collect();
    assert_eq!(
        answers,
        vec!["answer-0", "answer-1", "answer-2", "answer-3", "answer-4"]
    );

    for (i, result) in results.iter().enumerate() {
        let run_on = result.annotations.run_on.as_deref().unwrap();
        assert!(run_on == "gpu-a" || run_on == "gpu-b");
        assert_eq!(result.annotations.question_id_or_empty(), format!("q{}", i));
    }

    // 各タスクはちょうど1回だけ送信される
    let total_calls = gpu_a.generate_calls().await + gpu_b.generate_calls().await;
    assert_eq!(total_calls, 5);
    assert_eq!(orchestrator.completed(), 5);
    assert!(orchestrator.machines().iter().all(|m| !m.is_busy()));

    let dumped = std::fs::read_dir(dump_dir.path()).unwrap().count();
    assert_eq!(dumped, 5);
    assert!(dump_dir
        .path()
        .join("q0-flow_2024-05-01T12_30_45__123456Z.json")
        .exists());
}

#[tokio::test]
async fn test_remote_failure_aborts_run() {
    let broken = MockOllamaServer::start("broken").await;
    broken.fail_with(500).await;
    let healthy = MockOllamaServer::start("healthy").await;
    healthy.reply_all("ok").await;

    let config = config_for(&[&broken, &healthy], None);
    let orchestrator = Orchestrator::<Machine>::from_config(&config).unwrap();

    let err = orchestrator.run(tasks(3)).await.unwrap_err();

    assert!(matches!(err, DispatchError::Http(msg) if msg.contains("500")));
    assert!(orchestrator.machines().iter().all(|m| !m.is_busy()));
}

#[tokio::test]
async fn test_empty_configuration_with_tasks_is_rejected() {
    let orchestrator = Orchestrator::<Machine>::from_config(&DispatchConfig {
        show_progress: false,
        ..Default::default()
    })
    .unwrap();

    let err = orchestrator.run(tasks(1)).await.unwrap_err();
    assert!(matches!(err, DispatchError::NoWorkers));
}
