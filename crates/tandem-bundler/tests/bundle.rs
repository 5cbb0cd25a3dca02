//! Integration tests for client bundling.

use std::fs;
use std::path::Path;
use std::time::Duration;

use tandem_bundler::{BundleOutcome, BundleSettings, ClientBundler};
use tempfile::TempDir;

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    write(
        &temp.path().join("src/lib/greet.ts"),
        "export function greet(name: string): string {\n  return `hello ${name}`;\n}\n",
    );
    write(
        &temp.path().join("src/clients/player.ts"),
        "import { greet } from '../lib/greet.ts';\nclass Player {}\nconsole.log(greet('player'), new Player() instanceof Player);\n",
    );
    temp
}

fn bundler(temp: &TempDir) -> ClientBundler {
    ClientBundler::new(
        "src/clients/player.ts",
        ".build/public/player.js",
        temp.path(),
        BundleSettings::default(),
    )
    .unwrap()
}

async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    check()
}

#[tokio::test]
async fn test_build_writes_bundle_and_map() {
    let temp = project();
    let outcome = bundler(&temp).build().await;

    assert!(outcome.is_success(), "unexpected outcome: {outcome:?}");

    let bundle = temp.path().join(".build/public/player.js");
    let code = fs::read_to_string(&bundle).unwrap();
    assert!(!code.trim().is_empty());
    assert!(!code.contains(": string"));
    assert!(temp.path().join(".build/public/player.js.map").exists());
}

#[tokio::test]
async fn test_bundle_map_points_at_original_typescript() {
    let temp = project();
    assert!(bundler(&temp).build().await.is_success());

    let code = fs::read_to_string(temp.path().join(".build/public/player.js")).unwrap();
    let map = fs::read_to_string(temp.path().join(".build/public/player.js.map")).unwrap();

    assert!(map.contains("greet.ts"));
    assert!(map.contains("name: string"));
    assert!(!map.contains("data:application/json"));
    assert!(!code.contains("data:application/json"));
}

#[tokio::test]
async fn test_sibling_entries_and_lazy_chunks() {
    let temp = project();
    write(
        &temp.path().join("src/clients/player.ts"),
        "import('./lobby.ts').then((m) => m.enter());
import('../lib/lazy.ts').then((m) => console.log(m.later));
",
    );
    write(
        &temp.path().join("src/clients/lobby.ts"),
        "export function enter(): void { console.log('lobby'); }
",
    );
    write(
        &temp.path().join("src/lib/lazy.ts"),
        "export const later: string = 'loaded later';
",
    );

    let outcome = bundler(&temp).build().await;
    assert!(outcome.is_success(), "unexpected outcome: {outcome:?}");

    let public = temp.path().join(".build/public");
    assert!(public.join("player.js").is_file());
    assert!(public.join("lobby.js").is_file());

    let lazy_chunk = fs::read_dir(&public)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .find(|name| name.starts_with("lazy") && name.ends_with(".js"));
    let lazy_chunk = lazy_chunk.expect("no chunk for the lazily imported module");
    let chunk = fs::read_to_string(public.join(&lazy_chunk)).unwrap();
    assert!(chunk.contains("loaded later"));

    let code = fs::read_to_string(public.join("player.js")).unwrap();
    assert!(code.contains(&lazy_chunk));
}

#[tokio::test]
async fn test_template_dynamic_import_reaches_sibling_entry() {
    let temp = project();
    write(
        &temp.path().join("src/clients/player.ts"),
        "const name: string = location.hash.slice(1) || 'lobby';
import(`./${name}.js`).then((m) => m.enter());
",
    );
    write(
        &temp.path().join("src/clients/lobby.ts"),
        "export function enter(): void { console.log('lobby'); }
",
    );

    let outcome = bundler(&temp).build().await;
    assert!(outcome.is_success(), "unexpected outcome: {outcome:?}");

    let public = temp.path().join(".build/public");
    assert!(public.join("player.js").is_file());
    let lobby = fs::read_to_string(public.join("lobby.js")).unwrap();
    assert!(lobby.contains("lobby"));
}

#[tokio::test]
async fn test_unresolved_import_artifact_names_module() {
    let temp = project();
    write(
        &temp.path().join("src/clients/player.ts"),
        "import { x } from './missing-module.ts';
console.log(x);
",
    );

    let BundleOutcome::Failed { message } = bundler(&temp).build().await else {
        panic!("build should have failed");
    };
    assert!(message.contains("missing-module"), "message: {message}");
    assert!(!message.starts_with("(["));

    let artifact = fs::read_to_string(temp.path().join(".build/public/player.js")).unwrap();
    assert!(artifact.contains("document.body.innerHTML"));
    assert!(artifact.contains("missing-module"));
    assert!(!artifact.contains(&temp.path().to_string_lossy().to_string()));
}

#[tokio::test]
async fn test_syntax_error_writes_error_artifact() {
    let temp = project();
    write(
        &temp.path().join("src/lib/greet.ts"),
        "export function greet(name: string {\n  const staleGreetingMarker = `x`;\n}\n",
    );

    let outcome = bundler(&temp).build().await;
    let BundleOutcome::Failed { message } = outcome else {
        panic!("build should have failed");
    };
    assert!(!message.is_empty());

    let artifact = fs::read_to_string(temp.path().join(".build/public/player.js")).unwrap();
    assert!(artifact.contains("document.body.innerHTML"));
    assert!(artifact.contains("console.log(`"));
    // Parser messages quote tokens in backticks, escaped for the template literal.
    assert!(artifact.contains("\\`"));
    assert!(artifact.contains("./src/lib/greet.ts"));
    assert!(!artifact.contains("staleGreetingMarker"));
    assert!(!artifact.contains(&temp.path().to_string_lossy().to_string()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watch_survives_broken_edit() {
    let temp = project();
    let watch = bundler(&temp).watch(Duration::from_millis(50)).await.unwrap();
    let bundle = temp.path().join(".build/public/player.js");
    assert!(bundle.exists());

    tokio::time::sleep(Duration::from_millis(200)).await;
    write(
        &temp.path().join("src/lib/greet.ts"),
        "export function greet(name: string {\n  const staleGreetingMarker = 1;\n",
    );
    assert!(
        eventually(|| fs::read_to_string(&bundle)
            .map(|c| c.contains("document.body.innerHTML"))
            .unwrap_or(false))
        .await
    );
    let artifact = fs::read_to_string(&bundle).unwrap();
    assert!(artifact.contains("./src/lib/greet.ts"));
    assert!(artifact.contains("\\`"));
    assert!(!artifact.contains("staleGreetingMarker"));

    write(
        &temp.path().join("src/lib/greet.ts"),
        "export function greet(name: string): string {\n  return 'fixed ' + name;\n}\n",
    );
    assert!(
        eventually(|| fs::read_to_string(&bundle)
            .map(|c| c.contains("fixed") && !c.contains("document.body.innerHTML"))
            .unwrap_or(false))
        .await
    );

    watch.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watch_rebuilds_when_missing_import_appears() {
    let temp = project();
    write(&temp.path().join("src/shared/README.md"), "shared modules\n");
    write(
        &temp.path().join("src/clients/player.ts"),
        "import { extra } from '../shared/extra.ts';\nconsole.log(extra);\n",
    );

    let watch = bundler(&temp).watch(Duration::from_millis(50)).await.unwrap();
    let bundle = temp.path().join(".build/public/player.js");
    let artifact = fs::read_to_string(&bundle).unwrap();
    assert!(artifact.contains("document.body.innerHTML"));
    assert!(artifact.contains("extra.ts"));

    tokio::time::sleep(Duration::from_millis(200)).await;
    write(
        &temp.path().join("src/shared/extra.ts"),
        "export const extra: string = 'arrived later';\n",
    );
    assert!(
        eventually(|| fs::read_to_string(&bundle)
            .map(|c| c.contains("arrived later") && !c.contains("document.body.innerHTML"))
            .unwrap_or(false))
        .await
    );

    watch.stop().await;
}
