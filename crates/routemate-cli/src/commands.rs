//! Subcommand handlers.

use std::collections::{HashMap, HashSet};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use chrono::{DateTime, Local, Utc};
use futures::future::join_all;
use uuid::Uuid;

use routemate_core::models::{
    Comment, NewComment, NewRoute, Registration, Route, RouteImage, RouteUpdate, User,
};
use routemate_core::{ApiClient, AuthClient, Config, Session};

use crate::cli::{
    Command, CommentsCommand, CreateRouteArgs, FavoritesCommand, LoginArgs, RegisterArgs,
    RoutesCommand, UpdateRouteArgs,
};

/// Read by `login` and `register` before falling back to an interactive prompt
const PASSWORD_ENV: &str = "ROUTEMATE_PASSWORD";

/// Everything a command needs, built once in `main`.
pub struct Context {
    pub config: Config,
    pub session: Arc<Session>,
    pub api: ApiClient,
    pub auth: AuthClient,
}

pub async fn run(ctx: &Context, command: Command) -> Result<()> {
    match command {
        Command::Login(args) => login(ctx, args).await,
        Command::Logout => {
            ctx.auth.logout();
            println!("Signed out.");
            Ok(())
        }
        Command::Status => status(ctx).await,
        Command::Role => {
            require_login(ctx)?;
            let admin = ctx.session.fetch_role(&ctx.api).await;
            println!("{}", if admin { "admin" } else { "user" });
            Ok(())
        }
        Command::Register(args) => register(ctx, args).await,
        Command::Routes(cmd) => routes(ctx, cmd).await,
        Command::Favorites(cmd) => favorites(ctx, cmd).await,
        Command::Comments(cmd) => comments(ctx, cmd).await,
    }
}

// ===== Authentication =====

async fn login(ctx: &Context, args: LoginArgs) -> Result<()> {
    let username = match args.username.or_else(|| ctx.config.last_username.clone()) {
        Some(name) => name,
        None => prompt("Username: ")?,
    };
    let password = read_password()?;

    match ctx.auth.login(&username, &password).await? {
        Some(_) => {
            if let Err(e) = Config::remember_username(&username) {
                tracing::warn!(error = %e, "Could not save last username");
            }
            let status = ctx.session.status();
            match status.minutes_until_expiry() {
                Some(mins) => println!("Signed in as {} ({} min left).", username, mins),
                None => println!("Signed in as {}.", username),
            }
            Ok(())
        }
        None => bail!("The server issued an expired token. Please log in again."),
    }
}

async fn status(ctx: &Context) -> Result<()> {
    let status = ctx.session.status();
    let Some(username) = status.username.clone().filter(|_| status.authenticated) else {
        println!("Not signed in.");
        return Ok(());
    };

    let (admin, user) = tokio::join!(
        ctx.session.fetch_role(&ctx.api),
        ctx.api.fetch_user_by_username(&username)
    );

    match user {
        Ok(user) => println!("Signed in as {} ({})", user.username, user.full_name()),
        Err(e) => {
            tracing::debug!(error = %e, "Profile lookup failed");
            println!("Signed in as {}", username);
        }
    }
    println!("Role:    {}", if admin { "admin" } else { "user" });
    if let Some(expires_at) = status.expires_at {
        println!(
            "Expires: {} ({} min left)",
            format_time(expires_at),
            status.minutes_until_expiry().unwrap_or(0)
        );
    }
    Ok(())
}

async fn register(ctx: &Context, args: RegisterArgs) -> Result<()> {
    if ctx.auth.username_taken(&args.username).await? {
        bail!("Username {} is already taken", args.username);
    }
    let registration = Registration {
        username: args.username,
        password: read_password()?,
        email: args.email,
        firstname: args.first_name,
        lastname: args.last_name,
    };
    let message = ctx.auth.register(&registration).await?;
    println!("{}", message);
    Ok(())
}

// ===== Routes =====

async fn routes(ctx: &Context, cmd: RoutesCommand) -> Result<()> {
    match cmd {
        RoutesCommand::All => print_routes(&ctx.api.fetch_all_routes().await?),
        RoutesCommand::Mine => {
            let user = current_user(ctx).await?;
            print_routes(&ctx.api.fetch_user_routes(user.id).await?);
        }
        RoutesCommand::Show { route_id } => {
            let route = ctx.api.fetch_route(route_id).await?;
            println!("{}", route.name);
            println!("  {}", route.endpoints_display());
            if let Some(description) = route.description.as_deref().filter(|d| !d.is_empty()) {
                println!("  {}", description);
            }
            if let Some(created) = route.created_at {
                println!("  Created {}", format_time(created));
            }
        }
        RoutesCommand::Search { start, end } => {
            print_routes(&ctx.api.search_routes(&start, &end).await?)
        }
        RoutesCommand::Points { route_id } => {
            for point in ctx.api.fetch_route_points(route_id).await? {
                println!(
                    "{:<24} {:>10.5} {:>10.5}",
                    point.name, point.latitude, point.longitude
                );
            }
        }
        RoutesCommand::Create(args) => create_route(ctx, args).await?,
        RoutesCommand::Update(args) => {
            require_login(ctx)?;
            let UpdateRouteArgs { route_id, description, from, to } = args;
            let update = RouteUpdate {
                description,
                start_location: from,
                end_location: to,
            };
            println!("{}", ctx.api.update_route(route_id, &update).await?);
        }
        RoutesCommand::Delete { route_id } => {
            require_login(ctx)?;
            println!("{}", ctx.api.delete_route(route_id).await?);
        }
    }
    Ok(())
}

async fn create_route(ctx: &Context, args: CreateRouteArgs) -> Result<()> {
    let user = current_user(ctx).await?;
    let bytes = std::fs::read(&args.image)
        .with_context(|| format!("Failed to read image {}", args.image.display()))?;
    let file_name = args
        .image
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "finish-image".to_string());

    let route = NewRoute {
        name: args.name,
        description: args.description,
        start_lat: args.start.0,
        start_lng: args.start.1,
        end_lat: args.end.0,
        end_lng: args.end.1,
        user_id: user.id,
        start_location: args.from,
        end_location: args.to,
        finish_image: RouteImage { file_name, bytes },
        points: args.points,
    };
    println!("{}", ctx.api.create_route(&route).await?.trim_end());
    Ok(())
}

// ===== Favorites =====

async fn favorites(ctx: &Context, cmd: FavoritesCommand) -> Result<()> {
    let user = current_user(ctx).await?;
    match cmd {
        FavoritesCommand::List => {
            let ids = ctx.api.fetch_favorite_ids(user.id).await?;
            print_routes(&ctx.api.fetch_routes_by_ids(&ids).await?);
        }
        FavoritesCommand::Add { route_id } => {
            println!("{}", ctx.api.add_favorite(route_id, user.id).await?);
        }
        FavoritesCommand::Remove { route_id } => {
            println!("{}", ctx.api.remove_favorite(route_id, user.id).await?);
        }
    }
    Ok(())
}

// ===== Comments =====

async fn comments(ctx: &Context, cmd: CommentsCommand) -> Result<()> {
    match cmd {
        CommentsCommand::List { route_id } => {
            let comments = ctx.api.fetch_comments(route_id).await?;
            let authors = comment_authors(&ctx.api, &comments).await;
            for comment in &comments {
                let author = comment.user_id.and_then(|id| authors.get(&id)).map(String::as_str);
                println!("{}", format_comment(comment, author));
            }
        }
        CommentsCommand::Add { route_id, text } => {
            let user = current_user(ctx).await?;
            let comment = NewComment::now(route_id, user.id, &text);
            println!("{}", ctx.api.create_comment(&comment).await?);
        }
        CommentsCommand::Delete { comment_id } => {
            require_login(ctx)?;
            println!("{}", ctx.api.delete_comment(comment_id).await?);
        }
    }
    Ok(())
}

// ===== Helpers =====

fn require_login(ctx: &Context) -> Result<String> {
    match ctx.session.username() {
        Some(name) if ctx.session.is_authenticated() => Ok(name),
        _ => bail!("Not signed in. Run `routemate login` first."),
    }
}

async fn current_user(ctx: &Context) -> Result<User> {
    let username = require_login(ctx)?;
    ctx.api
        .fetch_user_by_username(&username)
        .await
        .with_context(|| format!("Failed to look up user {}", username))
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    rpassword::prompt_password("Password: ").context("Failed to read password")
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        bail!("Username is required");
    }
    Ok(value)
}

fn print_routes(routes: &[Route]) {
    if routes.is_empty() {
        println!("No routes.");
        return;
    }
    for route in routes {
        println!("{}", format_route_line(route));
    }
}

fn format_route_line(route: &Route) -> String {
    format!("{}  {:<28} {}", route.id, route.name, route.endpoints_display())
}

/// Look up comment authors concurrently. Users that fail to load are left out.
async fn comment_authors(api: &ApiClient, comments: &[Comment]) -> HashMap<Uuid, String> {
    let ids: HashSet<Uuid> = comments.iter().filter_map(|c| c.user_id).collect();
    let lookups: Vec<_> = ids.into_iter().map(|id| api.fetch_user(id)).collect();

    join_all(lookups)
        .await
        .into_iter()
        .filter_map(|result| match result {
            Ok(user) => Some((user.id, user.username)),
            Err(e) => {
                tracing::debug!(error = %e, "Comment author lookup failed");
                None
            }
        })
        .collect()
}

fn format_comment(comment: &Comment, author: Option<&str>) -> String {
    let when = comment
        .created_at
        .map(format_time)
        .unwrap_or_else(|| "-".to_string());
    format!("[{}] {}: {}", when, author.unwrap_or("unknown"), comment.comment)
}

fn format_time(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
