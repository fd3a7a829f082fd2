//! Scope Enforcement
//!
//! Checks a verified token against the requested action, the workspace it
//! is being used in, and the paths the action will touch. Path handling is
//! purely lexical: `.` and `..` are folded and nothing touches the
//! filesystem, so a symlink cannot change the answer.

use oxide_token::OverrideToken;

/// Why a verified token does not permit a request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeViolation {
    /// Action is on the deny list
    #[error("action denied by token capability deny list: {action}")]
    ActionDenied {
        /// Requested action
        action: String,
    },

    /// Action is missing from the allow list
    #[error("action not present in token capability allow list: {action}")]
    ActionNotAllowed {
        /// Requested action
        action: String,
    },

    /// Token is bound to another workspace
    #[error("token project.repo_root does not match current workspace root")]
    RepoRootMismatch,

    /// Workspace repository is not listed
    #[error("current repository is not listed in token project.scope.allowed_repos")]
    RepoNotAllowed,

    /// Path matches no allowed pattern
    #[error("path outside allowed_paths scope: {path}")]
    PathOutsideScope {
        /// Offending path as requested
        path: String,
    },

    /// Path matches a disallowed pattern
    #[error("path matches disallowed_paths scope: {path}")]
    PathDisallowed {
        /// Offending path as requested
        path: String,
    },
}

/// Check that `token` permits `action` on `affected_paths` inside `workspace_root`
///
/// The NO-GO precondition is carried by the token type itself; a token whose
/// gate status is anything else never deserializes.
///
/// # Errors
/// Returns the first [`ScopeViolation`] found, checking the deny list, the
/// allow list, workspace identity, the repository allow-list, then each
/// path in order.
pub fn assert_permits(
    token: &OverrideToken,
    action: &str,
    affected_paths: &[String],
    workspace_root: &str,
) -> Result<(), ScopeViolation> {
    let capabilities = &token.capabilities;
    if capabilities.deny.iter().any(|a| a == action) {
        return Err(ScopeViolation::ActionDenied {
            action: action.to_owned(),
        });
    }
    if !capabilities.allow.iter().any(|a| a == action) {
        return Err(ScopeViolation::ActionNotAllowed {
            action: action.to_owned(),
        });
    }

    let project = &token.project;
    let root = lexical_resolve(workspace_root, ".");
    let token_root = lexical_resolve(workspace_root, &project.repo_root);
    let resolved_root = normalize_for_compare(&root);
    if resolved_root != normalize_for_compare(&token_root) {
        return Err(ScopeViolation::RepoRootMismatch);
    }

    let candidates = [
        normalize_for_compare(&project.repo_root),
        normalize_for_compare(basename(&root)),
        resolved_root,
    ];
    let repo_allowed = project
        .scope
        .allowed_repos
        .iter()
        .map(|repo| normalize_for_compare(repo))
        .any(|repo| candidates.contains(&repo));
    if !repo_allowed {
        return Err(ScopeViolation::RepoNotAllowed);
    }

    for target in affected_paths {
        let absolute = lexical_resolve(workspace_root, target);
        let relative = normalize_for_compare(&relative_to(&root, &absolute));

        if !project.scope.allowed_paths.iter().any(|scope| is_within_scope(&relative, scope)) {
            return Err(ScopeViolation::PathOutsideScope { path: target.clone() });
        }
        if project.scope.disallowed_paths.iter().any(|scope| is_within_scope(&relative, scope)) {
            return Err(ScopeViolation::PathDisallowed { path: target.clone() });
        }
    }

    Ok(())
}

/// Forward slashes, no trailing slash, lowercase
#[must_use]
pub fn normalize_for_compare(path: &str) -> String {
    path.replace('\\', "/").trim_end_matches('/').to_lowercase()
}

/// Whether `target` equals `scope` or lies beneath it
#[must_use]
pub fn is_within_scope(target: &str, scope: &str) -> bool {
    let target = normalize_for_compare(target);
    let scope = normalize_for_compare(scope);
    if scope.is_empty() {
        return target.is_empty() || target.starts_with('/');
    }
    target == scope || target.strip_prefix(&scope).is_some_and(|rest| rest.starts_with('/'))
}

/// Join `path` onto `base` unless it is absolute, then fold `.` and `..`
///
/// The result uses `/` separators and has no trailing slash. `..` never
/// climbs above the root of an absolute path.
#[must_use]
pub fn lexical_resolve(base: &str, path: &str) -> String {
    let path = path.replace('\\', "/");
    let joined = if is_absolute(&path) {
        path
    } else {
        format!("{}/{path}", base.replace('\\', "/"))
    };

    let absolute = joined.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in joined.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let body = parts.join("/");
    if absolute {
        format!("/{body}")
    } else if body.is_empty() {
        ".".to_owned()
    } else {
        body
    }
}

/// Path of `target` relative to `root`; both must be lexically resolved
#[must_use]
pub fn relative_to(root: &str, target: &str) -> String {
    let root_parts: Vec<&str> = split_parts(root);
    let target_parts: Vec<&str> = split_parts(target);
    let common = root_parts
        .iter()
        .zip(&target_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let ups = std::iter::repeat("..").take(root_parts.len() - common);
    ups.chain(target_parts[common..].iter().copied())
        .collect::<Vec<_>>()
        .join("/")
}

fn split_parts(path: &str) -> Vec<&str> {
    path.split('/').filter(|p| !p.is_empty() && *p != ".").collect()
}

fn basename(resolved: &str) -> &str {
    resolved.rsplit('/').find(|p| !p.is_empty()).unwrap_or("")
}

fn is_absolute(path: &str) -> bool {
    path.starts_with('/') || path.as_bytes().get(1) == Some(&b':')
}
