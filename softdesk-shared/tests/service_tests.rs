/// Service-level tests against the in-memory store
///
/// These exercise the authorization model end to end without a database:
/// every operation goes through the same units of work the API uses.

use softdesk_shared::auth::middleware::AuthContext;
use softdesk_shared::error::ServiceError;
use softdesk_shared::models::issue::IssueStatus;
use softdesk_shared::service::hierarchy::{
    self, CommentChanges, IssueChanges, NewComment, NewIssue, NewProject, ProjectChanges,
};
use softdesk_shared::service::identity::{self, ProfileUpdate, Registration};
use softdesk_shared::service::membership;
use softdesk_shared::store::memory::MemoryStore;
use softdesk_shared::store::Store;
use uuid::Uuid;

const PASSWORD: &str = "correct horse battery";

async fn register(store: &MemoryStore, username: &str) -> AuthContext {
    let user = identity::register(
        store,
        Registration {
            username: username.to_string(),
            password: PASSWORD.to_string(),
            email: Some(format!("{}@example.com", username)),
            age: Some(30),
            ..Default::default()
        },
    )
    .await
    .expect("registration should succeed");

    AuthContext::new(user.id)
}

async fn project(store: &MemoryStore, author: &AuthContext, title: &str) -> Uuid {
    hierarchy::create_project(
        store,
        Some(author),
        NewProject {
            title: title.to_string(),
            ..Default::default()
        },
    )
    .await
    .expect("project creation should succeed")
    .id
}

async fn issue(store: &MemoryStore, author: &AuthContext, project_id: Uuid, title: &str) -> Uuid {
    hierarchy::create_issue(
        store,
        Some(author),
        project_id,
        NewIssue {
            title: title.to_string(),
            ..Default::default()
        },
    )
    .await
    .expect("issue creation should succeed")
    .id
}

#[tokio::test]
async fn test_author_is_contributor_after_creation() {
    let store = MemoryStore::new();
    let alice = register(&store, "alice").await;

    let project_id = project(&store, &alice, "Sprint1").await;

    assert!(membership::is_contributor(&store, alice.user_id, project_id).await.unwrap());
    let contributors = membership::list_for_project(&store, Some(&alice), project_id).await.unwrap();
    assert_eq!(contributors.len(), 1);
    assert_eq!(contributors[0].user_id, alice.user_id);
}

#[tokio::test]
async fn test_soft_delete_disables_login_and_anonymizes() {
    let store = MemoryStore::new();
    let alice = register(&store, "alice").await;
    let project_id = project(&store, &alice, "Sprint1").await;

    assert!(identity::authenticate(&store, "alice", PASSWORD).await.is_ok());

    identity::soft_delete(&store, Some(&alice), alice.user_id).await.unwrap();

    assert!(matches!(
        identity::authenticate(&store, "alice", PASSWORD).await,
        Err(ServiceError::Unauthenticated)
    ));
    assert!(matches!(
        identity::resolve_actor(&store, alice.user_id).await,
        Err(ServiceError::Unauthenticated)
    ));

    let mut uow = store.begin().await.unwrap();
    let user = uow.find_user(alice.user_id).await.unwrap().unwrap();
    assert!(!user.active);
    assert_eq!(user.email, "");
    assert_eq!(user.username, format!("deleted_{}", alice.user_id.simple()));
    assert!(!user.can_be_contacted);

    // Authorship and membership survive
    let author = uow.find_project(project_id).await.unwrap().unwrap().author_id;
    assert_eq!(author, alice.user_id);
    assert!(uow.is_contributor(project_id, alice.user_id).await.unwrap());
}

#[tokio::test]
async fn test_soft_delete_is_idempotent() {
    let store = MemoryStore::new();
    let alice = register(&store, "alice").await;

    identity::soft_delete(&store, Some(&alice), alice.user_id).await.unwrap();
    identity::soft_delete(&store, Some(&alice), alice.user_id).await.unwrap();

    // The old username is free again
    register(&store, "alice").await;
}

#[tokio::test]
async fn test_anonymized_username_cannot_be_taken() {
    let store = MemoryStore::new();
    let alice = register(&store, "alice").await;
    project(&store, &alice, "Sprint1").await;
    let mallory = register(&store, "mallory").await;

    // Author ids are visible to anyone through the project list
    let listed = hierarchy::list_projects(&store, Some(&mallory)).await.unwrap();
    let target = format!("deleted_{}", listed[0].author_id.simple());

    let squat = Registration {
        username: target.clone(),
        password: PASSWORD.to_string(),
        age: Some(30),
        ..Default::default()
    };
    assert!(matches!(
        identity::register(&store, squat).await,
        Err(ServiceError::Validation(ref f)) if f[0].field == "username"
    ));

    let rename = ProfileUpdate {
        username: Some(target),
        ..Default::default()
    };
    assert!(matches!(
        identity::update(&store, Some(&mallory), mallory.user_id, rename).await,
        Err(ServiceError::Validation(ref f)) if f[0].field == "username"
    ));

    identity::soft_delete(&store, Some(&alice), alice.user_id).await.unwrap();
    assert!(identity::authenticate(&store, "alice", PASSWORD).await.is_err());
}

#[tokio::test]
async fn test_user_records_are_self_scoped() {
    let store = MemoryStore::new();
    let alice = register(&store, "alice").await;
    let bob = register(&store, "bob").await;

    let listed = identity::list_self(&store, Some(&alice)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, alice.user_id);

    assert!(matches!(
        identity::retrieve(&store, Some(&bob), alice.user_id).await,
        Err(ServiceError::NotFound)
    ));
    assert!(matches!(
        identity::update(&store, Some(&bob), alice.user_id, ProfileUpdate::default()).await,
        Err(ServiceError::NotFound)
    ));
    assert!(matches!(
        identity::soft_delete(&store, Some(&bob), alice.user_id).await,
        Err(ServiceError::NotFound)
    ));
    assert!(matches!(identity::list_self(&store, None).await, Err(ServiceError::Unauthenticated)));
}

#[tokio::test]
async fn test_password_change_rehashes() {
    let store = MemoryStore::new();
    let alice = register(&store, "alice").await;

    let updated = identity::update(
        &store,
        Some(&alice),
        alice.user_id,
        ProfileUpdate {
            password: Some("a brand new password".to_string()),
            age: Some(31),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(updated.age, 31);
    assert!(updated.password_hash.starts_with("$argon2id$"));
    assert!(identity::authenticate(&store, "alice", PASSWORD).await.is_err());
    assert!(identity::authenticate(&store, "alice", "a brand new password").await.is_ok());
}

#[tokio::test]
async fn test_registration_validation() {
    let store = MemoryStore::new();
    register(&store, "alice").await;

    let base = Registration {
        username: "carol".to_string(),
        password: PASSWORD.to_string(),
        age: Some(30),
        ..Default::default()
    };

    let missing_age = Registration { age: None, ..base.clone() };
    assert!(matches!(
        identity::register(&store, missing_age).await,
        Err(ServiceError::Validation(ref f)) if f[0].field == "age"
    ));

    let too_young = Registration { age: Some(14), ..base.clone() };
    assert!(matches!(identity::register(&store, too_young).await, Err(ServiceError::Validation(_))));

    let taken = Registration {
        username: "alice".to_string(),
        ..base.clone()
    };
    assert!(matches!(
        identity::register(&store, taken).await,
        Err(ServiceError::Validation(ref f)) if f[0].field == "username"
    ));

    // An empty email is accepted as "no email"
    let blank_email = Registration {
        email: Some(String::new()),
        ..base
    };
    let carol = identity::register(&store, blank_email).await.unwrap();
    assert_eq!(carol.email, "");
}

#[tokio::test]
async fn test_non_contributor_sees_not_found() {
    let store = MemoryStore::new();
    let alice = register(&store, "alice").await;
    let bob = register(&store, "bob").await;
    let project_id = project(&store, &alice, "Sprint1").await;
    let issue_id = issue(&store, &alice, project_id, "Bug A").await;

    assert!(matches!(
        hierarchy::get_project(&store, Some(&bob), project_id).await,
        Err(ServiceError::NotFound)
    ));
    assert!(matches!(
        hierarchy::list_issues(&store, Some(&bob), project_id).await,
        Err(ServiceError::NotFound)
    ));
    assert!(matches!(
        hierarchy::get_issue(&store, Some(&bob), project_id, issue_id).await,
        Err(ServiceError::NotFound)
    ));
    assert!(matches!(
        hierarchy::update_project(&store, Some(&bob), project_id, ProjectChanges::default()).await,
        Err(ServiceError::NotFound)
    ));
    assert!(matches!(
        hierarchy::create_issue(
            &store,
            Some(&bob),
            project_id,
            NewIssue {
                title: "Sneaky".to_string(),
                ..Default::default()
            }
        )
        .await,
        Err(ServiceError::NotFound)
    ));

    // Listing projects stays unfiltered
    let all = hierarchy::list_projects(&store, Some(&bob)).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_only_author_updates_project() {
    let store = MemoryStore::new();
    let alice = register(&store, "alice").await;
    let bob = register(&store, "bob").await;
    let project_id = project(&store, &alice, "Sprint1").await;
    membership::add_self(&store, Some(&bob), project_id, None).await.unwrap();

    let rename = ProjectChanges {
        title: Some("Sprint2".to_string()),
        ..Default::default()
    };

    assert!(matches!(
        hierarchy::update_project(&store, Some(&bob), project_id, rename.clone()).await,
        Err(ServiceError::Forbidden)
    ));

    let updated = hierarchy::update_project(&store, Some(&alice), project_id, rename).await.unwrap();
    assert_eq!(updated.title, "Sprint2");
}

#[tokio::test]
async fn test_issue_author_is_actor() {
    let store = MemoryStore::new();
    let alice = register(&store, "alice").await;
    let bob = register(&store, "bob").await;
    let project_id = project(&store, &alice, "Sprint1").await;
    membership::add_self(&store, Some(&bob), project_id, None).await.unwrap();

    let issue_id = issue(&store, &bob, project_id, "Bug A").await;

    let detail = hierarchy::get_issue(&store, Some(&alice), project_id, issue_id).await.unwrap();
    assert_eq!(detail.issue.author_id, bob.user_id);
    assert_eq!(detail.issue.status, IssueStatus::Todo);
}

#[tokio::test]
async fn test_assignee_must_be_contributor() {
    let store = MemoryStore::new();
    let alice = register(&store, "alice").await;
    let bob = register(&store, "bob").await;
    let project_id = project(&store, &alice, "Sprint1").await;

    let assign_bob = NewIssue {
        title: "Bug A".to_string(),
        assignee_id: Some(bob.user_id),
        ..Default::default()
    };
    assert!(matches!(
        hierarchy::create_issue(&store, Some(&alice), project_id, assign_bob.clone()).await,
        Err(ServiceError::Validation(_))
    ));

    membership::add_self(&store, Some(&bob), project_id, None).await.unwrap();
    let created = hierarchy::create_issue(&store, Some(&alice), project_id, assign_bob).await.unwrap();
    assert_eq!(created.assignee_id, Some(bob.user_id));

    let unassign = IssueChanges {
        assignee_id: Some(None),
        ..Default::default()
    };
    let updated = hierarchy::update_issue(&store, Some(&alice), project_id, created.id, unassign)
        .await
        .unwrap();
    assert_eq!(updated.assignee_id, None);
}

#[tokio::test]
async fn test_mismatched_ancestry_is_not_found() {
    let store = MemoryStore::new();
    let alice = register(&store, "alice").await;
    let first = project(&store, &alice, "Sprint1").await;
    let second = project(&store, &alice, "Sprint2").await;
    let issue_id = issue(&store, &alice, first, "Bug A").await;

    let comment = hierarchy::create_comment(
        &store,
        Some(&alice),
        first,
        issue_id,
        NewComment {
            body: "Reproduced".to_string(),
        },
    )
    .await
    .unwrap();

    assert!(matches!(
        hierarchy::get_issue(&store, Some(&alice), second, issue_id).await,
        Err(ServiceError::NotFound)
    ));
    assert!(matches!(
        hierarchy::get_comment(&store, Some(&alice), second, issue_id, comment.id).await,
        Err(ServiceError::NotFound)
    ));

    let other_issue = issue(&store, &alice, first, "Bug B").await;
    assert!(matches!(
        hierarchy::get_comment(&store, Some(&alice), first, other_issue, comment.id).await,
        Err(ServiceError::NotFound)
    ));

    let found = hierarchy::get_comment(&store, Some(&alice), first, issue_id, comment.id).await.unwrap();
    assert_eq!(found.body, "Reproduced");
}

#[tokio::test]
async fn test_comment_lifecycle() {
    let store = MemoryStore::new();
    let alice = register(&store, "alice").await;
    let bob = register(&store, "bob").await;
    let project_id = project(&store, &alice, "Sprint1").await;
    let issue_id = issue(&store, &alice, project_id, "Bug A").await;
    membership::add_self(&store, Some(&bob), project_id, None).await.unwrap();

    let comment = hierarchy::create_comment(
        &store,
        Some(&bob),
        project_id,
        issue_id,
        NewComment {
            body: "Looking into it".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(comment.author_id, bob.user_id);

    let edit = CommentChanges {
        body: Some("Fixed".to_string()),
    };
    assert!(matches!(
        hierarchy::update_comment(&store, Some(&alice), project_id, issue_id, comment.id, edit.clone()).await,
        Err(ServiceError::Forbidden)
    ));
    let edited = hierarchy::update_comment(&store, Some(&bob), project_id, issue_id, comment.id, edit)
        .await
        .unwrap();
    assert_eq!(edited.body, "Fixed");

    let blank = NewComment { body: String::new() };
    assert!(matches!(
        hierarchy::create_comment(&store, Some(&bob), project_id, issue_id, blank).await,
        Err(ServiceError::Validation(_))
    ));

    hierarchy::delete_comment(&store, Some(&bob), project_id, issue_id, comment.id).await.unwrap();
    let remaining = hierarchy::list_comments(&store, Some(&alice), project_id, issue_id).await.unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn test_project_delete_cascades() {
    let store = MemoryStore::new();
    let alice = register(&store, "alice").await;
    let bob = register(&store, "bob").await;
    let project_id = project(&store, &alice, "Sprint1").await;
    let keep_id = project(&store, &alice, "Keep").await;
    membership::add_self(&store, Some(&bob), project_id, None).await.unwrap();
    let issue_id = issue(&store, &alice, project_id, "Bug A").await;
    let kept_issue = issue(&store, &alice, keep_id, "Bug K").await;
    let comment = hierarchy::create_comment(
        &store,
        Some(&bob),
        project_id,
        issue_id,
        NewComment {
            body: "Me too".to_string(),
        },
    )
    .await
    .unwrap();

    assert!(matches!(
        hierarchy::delete_project(&store, Some(&bob), project_id).await,
        Err(ServiceError::Forbidden)
    ));
    hierarchy::delete_project(&store, Some(&alice), project_id).await.unwrap();

    let mut uow = store.begin().await.unwrap();
    assert!(uow.find_project(project_id).await.unwrap().is_none());
    assert!(uow.find_issue_in_project(project_id, issue_id).await.unwrap().is_none());
    assert!(uow.find_comment_in_issue(issue_id, comment.id).await.unwrap().is_none());
    assert!(uow.list_contributors(project_id).await.unwrap().is_empty());

    // Other projects are untouched
    assert!(uow.find_issue_in_project(keep_id, kept_issue).await.unwrap().is_some());
    drop(uow);

    let projects = membership::list_for_user(&store, Some(&bob)).await.unwrap();
    assert!(projects.is_empty());
}

#[tokio::test]
async fn test_membership_rules() {
    let store = MemoryStore::new();
    let alice = register(&store, "alice").await;
    let bob = register(&store, "bob").await;
    let project_id = project(&store, &alice, "Sprint1").await;

    // Enrolling someone else
    assert!(matches!(
        membership::add_self(&store, Some(&bob), project_id, Some(alice.user_id)).await,
        Err(ServiceError::Forbidden)
    ));

    // Unknown project
    assert!(matches!(
        membership::add_self(&store, Some(&bob), Uuid::new_v4(), None).await,
        Err(ServiceError::NotFound)
    ));

    membership::add_self(&store, Some(&bob), project_id, Some(bob.user_id)).await.unwrap();
    assert!(matches!(
        membership::add_self(&store, Some(&bob), project_id, None).await,
        Err(ServiceError::Conflict(_))
    ));

    let projects = membership::list_for_user(&store, Some(&bob)).await.unwrap();
    assert_eq!(projects.iter().map(|p| p.id).collect::<Vec<_>>(), vec![project_id]);

    // The author stays
    assert!(matches!(
        membership::leave(&store, Some(&alice), project_id).await,
        Err(ServiceError::Forbidden)
    ));

    membership::leave(&store, Some(&bob), project_id).await.unwrap();
    assert!(!membership::is_contributor(&store, bob.user_id, project_id).await.unwrap());
    assert!(matches!(
        membership::leave(&store, Some(&bob), project_id).await,
        Err(ServiceError::NotFound)
    ));
}

#[tokio::test]
async fn test_anonymous_actor_is_unauthenticated() {
    let store = MemoryStore::new();
    let alice = register(&store, "alice").await;
    let project_id = project(&store, &alice, "Sprint1").await;

    assert!(matches!(hierarchy::list_projects(&store, None).await, Err(ServiceError::Unauthenticated)));
    assert!(matches!(
        hierarchy::get_project(&store, None, project_id).await,
        Err(ServiceError::Unauthenticated)
    ));
    assert!(matches!(
        hierarchy::get_project(&store, None, Uuid::new_v4()).await,
        Err(ServiceError::Unauthenticated)
    ));
    assert!(matches!(
        membership::add_self(&store, None, project_id, None).await,
        Err(ServiceError::Unauthenticated)
    ));
}

#[tokio::test]
async fn test_alice_and_bob_scenario() {
    let store = MemoryStore::new();

    let alice = register(&store, "alice").await;
    let sprint = project(&store, &alice, "Sprint1").await;
    let contributors = membership::list_for_project(&store, Some(&alice), sprint).await.unwrap();
    assert_eq!(contributors.len(), 1);
    let bug = issue(&store, &alice, sprint, "Bug A").await;

    let bob = register(&store, "bob").await;
    assert!(matches!(
        hierarchy::get_project(&store, Some(&bob), sprint).await,
        Err(ServiceError::NotFound)
    ));

    membership::add_self(&store, Some(&bob), sprint, None).await.unwrap();
    let detail = hierarchy::get_project(&store, Some(&bob), sprint).await.unwrap();
    assert_eq!(detail.project.title, "Sprint1");
    assert_eq!(detail.issues.len(), 1);
    let members: Vec<_> = detail.contributors.iter().map(|c| c.user_id).collect();
    assert_eq!(members, vec![alice.user_id, bob.user_id]);

    assert!(matches!(
        hierarchy::delete_issue(&store, Some(&bob), sprint, bug).await,
        Err(ServiceError::Forbidden)
    ));
}
