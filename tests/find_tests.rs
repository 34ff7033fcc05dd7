//! find expression engine scenarios over a seeded project tree.

use vbash::Shell;

/// The standard fixture: a small project with nested sources.
fn project_shell() -> Shell {
    Shell::builder()
        .file("/project/README.md", "# Project\n")
        .file("/project/package.json", "{\"name\":\"project\"}\n")
        .file("/project/tsconfig.json", "{\"strict\":true}\n")
        .file("/project/src/index.ts", "export {};\n")
        .file("/project/src/util.ts", "export const u = 1;\n")
        .file("/project/tests/index.test.ts", "test1\n")
        .file("/project/tests/util.test.ts", "test2\n")
        .build()
}

#[tokio::test]
async fn find_lists_preorder_with_sorted_siblings() {
    let mut shell = project_shell();
    let result = shell.exec("find /project").await;
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stderr, "");
    assert_eq!(
        result.stdout,
        "/project\n\
         /project/README.md\n\
         /project/package.json\n\
         /project/src\n\
         /project/src/index.ts\n\
         /project/src/util.ts\n\
         /project/tests\n\
         /project/tests/index.test.ts\n\
         /project/tests/util.test.ts\n\
         /project/tsconfig.json\n"
    );
}

#[tokio::test]
async fn find_name_and_type_conjunction() {
    let mut shell = project_shell();
    let result = shell.exec("find /project -name \"*.ts\" -type f").await;
    assert_eq!(result.exit_code, 0);
    assert_eq!(
        result.stdout,
        "/project/src/index.ts\n\
         /project/src/util.ts\n\
         /project/tests/index.test.ts\n\
         /project/tests/util.test.ts\n"
    );
}

#[tokio::test]
async fn find_or_combines_patterns() {
    let mut shell = project_shell();
    let result = shell
        .exec("find /project -name \"*.md\" -o -name \"*.json\"")
        .await;
    assert_eq!(result.exit_code, 0);
    assert_eq!(
        result.stdout,
        "/project/README.md\n\
         /project/package.json\n\
         /project/tsconfig.json\n"
    );
}

#[tokio::test]
async fn find_grouped_expression_with_exec() {
    let mut shell = project_shell();
    let result = shell
        .exec("find /project -type f \\( -name \"*.md\" -o -name \"*.json\" \\) -exec cat {} \\;")
        .await;
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stderr, "");
    // -exec suppresses the default print; output is the concatenation of the
    // matched files' contents, in traversal order
    assert_eq!(
        result.stdout,
        "# Project\n{\"name\":\"project\"}\n{\"strict\":true}\n"
    );
}

#[tokio::test]
async fn find_missing_path_reports_and_continues() {
    let mut shell = project_shell();
    let result = shell.exec("find /nonexistent").await;
    assert_eq!(result.stdout, "");
    assert_eq!(result.stderr, "find: /nonexistent: No such file or directory\n");
    assert_eq!(result.exit_code, 1);

    // Remaining paths are still traversed and the exit code stays 1
    let result = shell.exec("find /nonexistent /project/src -type f").await;
    assert_eq!(
        result.stdout,
        "/project/src/index.ts\n/project/src/util.ts\n"
    );
    assert!(result.stderr.contains("find: /nonexistent:"));
    assert_eq!(result.exit_code, 1);
}

#[tokio::test]
async fn find_type_d_lists_directories() {
    let mut shell = project_shell();
    let result = shell.exec("find /project -type d").await;
    assert_eq!(
        result.stdout,
        "/project\n/project/src\n/project/tests\n"
    );
}

#[tokio::test]
async fn find_maxdepth_caps_descent() {
    let mut shell = project_shell();
    let result = shell.exec("find /project -maxdepth 1").await;
    assert_eq!(
        result.stdout,
        "/project\n\
         /project/README.md\n\
         /project/package.json\n\
         /project/src\n\
         /project/tests\n\
         /project/tsconfig.json\n"
    );

    let result = shell.exec("find /project -maxdepth 0").await;
    assert_eq!(result.stdout, "/project\n");
}

#[tokio::test]
async fn find_not_negates() {
    let mut shell = project_shell();
    let result = shell
        .exec("find /project/src ! -name \"*.ts\"")
        .await;
    assert_eq!(result.stdout, "/project/src\n");
}

#[tokio::test]
async fn find_implicit_and_short_circuits() {
    // -exec must not run for entries already rejected by -name
    let mut shell = project_shell();
    let result = shell
        .exec("find /project -name \"*.md\" -exec echo saw {} \\;")
        .await;
    assert_eq!(result.stdout, "saw /project/README.md\n");
}

#[tokio::test]
async fn find_exec_exit_status_is_predicate_truth() {
    let mut shell = project_shell();
    // grep -q succeeds only for files containing "strict"; the path prints
    // through the following -print
    let result = shell
        .exec("find /project -type f -exec grep -q strict {} \\; -print")
        .await;
    assert_eq!(result.stdout, "/project/tsconfig.json\n");
    assert_eq!(result.exit_code, 0);
}

#[tokio::test]
async fn find_help_prints_usage() {
    let mut shell = project_shell();
    let result = shell.exec("find --help").await;
    assert_eq!(result.exit_code, 0);
    assert!(result.stdout.contains("Usage: find"));
    assert!(result.stdout.contains("-name"));
}

#[tokio::test]
async fn find_unknown_predicate() {
    let mut shell = project_shell();
    let result = shell.exec("find /project -frobnicate").await;
    assert_eq!(result.exit_code, 1);
    assert_eq!(result.stderr, "find: unknown predicate '-frobnicate'\n");
    assert_eq!(result.stdout, "");
}

#[tokio::test]
async fn find_bad_type_argument() {
    let mut shell = project_shell();
    let result = shell.exec("find /project -type x").await;
    assert_eq!(result.exit_code, 1);
    assert_eq!(result.stderr, "find: Unknown argument to -type: x\n");
}

#[tokio::test]
async fn find_relative_path_display() {
    let mut shell = project_shell();
    shell.exec("cd /project").await;
    let result = shell.exec("find src -name \"*.ts\"").await;
    assert_eq!(result.stdout, "src/index.ts\nsrc/util.ts\n");
}

#[tokio::test]
async fn find_name_matches_basename_only() {
    let mut shell = project_shell();
    // "src" appears in paths, but -name only sees basenames
    let result = shell.exec("find /project -name src").await;
    assert_eq!(result.stdout, "/project/src\n");
}

#[tokio::test]
async fn find_character_class_glob() {
    let mut shell = project_shell();
    let result = shell.exec("find /project -name \"[pt]*.json\"").await;
    assert_eq!(
        result.stdout,
        "/project/package.json\n/project/tsconfig.json\n"
    );
}

#[tokio::test]
async fn find_file_as_start_path() {
    let mut shell = project_shell();
    let result = shell.exec("find /project/README.md").await;
    assert_eq!(result.stdout, "/project/README.md\n");
}

#[tokio::test]
async fn find_exec_runs_user_function() {
    let mut shell = project_shell();
    shell.exec("tag() { echo \"ts: $1\"; }").await;
    let result = shell
        .exec("find /project/src -type f -exec tag {} \\;")
        .await;
    assert_eq!(
        result.stdout,
        "ts: /project/src/index.ts\nts: /project/src/util.ts\n"
    );
}
