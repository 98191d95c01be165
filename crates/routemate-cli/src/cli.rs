use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};
use routemate_core::models::PlannedPoint;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "routemate", version, about = "Plan, share and favorite routes from the terminal")]
pub struct Cli {
    /// API base URL (overrides the config file)
    #[arg(long, global = true, env = "ROUTEMATE_API_URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the session token
    Login(LoginArgs),
    /// Clear the stored session
    Logout,
    /// Show who is signed in and until when
    Status,
    /// Check whether the signed-in user is an administrator
    Role,
    /// Create a new account
    Register(RegisterArgs),
    /// Browse and manage routes
    #[command(subcommand)]
    Routes(RoutesCommand),
    /// Manage favorite routes
    #[command(subcommand)]
    Favorites(FavoritesCommand),
    /// Read and write route comments
    #[command(subcommand)]
    Comments(CommentsCommand),
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    #[arg(short, long, env = "ROUTEMATE_USERNAME")]
    pub username: Option<String>,
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
}

#[derive(Debug, Subcommand)]
pub enum RoutesCommand {
    /// List every route
    All,
    /// List routes created by the signed-in user
    Mine,
    /// Show one route in detail
    Show { route_id: Uuid },
    /// Find routes between two places
    Search { start: String, end: String },
    /// List the waypoints of a route
    Points { route_id: Uuid },
    /// Create a route from its endpoints, a finish photo and waypoints
    Create(CreateRouteArgs),
    /// Edit the description or place names of a route
    Update(UpdateRouteArgs),
    /// Delete a route
    Delete { route_id: Uuid },
}

#[derive(Debug, Args)]
pub struct CreateRouteArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub description: Option<String>,
    /// Start coordinates as LAT,LNG
    #[arg(long, value_parser = parse_coordinates, allow_hyphen_values = true)]
    pub start: (f64, f64),
    /// End coordinates as LAT,LNG
    #[arg(long, value_parser = parse_coordinates, allow_hyphen_values = true)]
    pub end: (f64, f64),
    /// Name of the starting place
    #[arg(long)]
    pub from: Option<String>,
    /// Name of the destination
    #[arg(long)]
    pub to: Option<String>,
    /// Photo of the finished route
    #[arg(long)]
    pub image: PathBuf,
    /// Waypoint as NAME:LAT,LNG (repeatable)
    #[arg(long = "point", value_parser = parse_point, allow_hyphen_values = true)]
    pub points: Vec<PlannedPoint>,
}

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("changes").required(true).multiple(true).args(["description", "from", "to"])))]
pub struct UpdateRouteArgs {
    pub route_id: Uuid,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub from: Option<String>,
    #[arg(long)]
    pub to: Option<String>,
}

fn parse_coordinates(value: &str) -> Result<(f64, f64), String> {
    let (lat, lng) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LNG, got {:?}", value))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude: {}", e))?;
    let lng: f64 = lng.trim().parse().map_err(|e| format!("bad longitude: {}", e))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(format!("coordinates out of range: {}", value));
    }
    Ok((lat, lng))
}

fn parse_point(value: &str) -> Result<PlannedPoint, String> {
    let (name, coordinates) = value
        .rsplit_once(':')
        .ok_or_else(|| format!("expected NAME:LAT,LNG, got {:?}", value))?;
    if name.trim().is_empty() {
        return Err("waypoint name is empty".to_string());
    }
    let (latitude, longitude) = parse_coordinates(coordinates)?;
    Ok(PlannedPoint {
        name: name.trim().to_string(),
        description: None,
        latitude,
        longitude,
    })
}

#[derive(Debug, Subcommand)]
pub enum FavoritesCommand {
    /// List the signed-in user's favorite routes
    List,
    /// Add a route to favorites
    Add { route_id: Uuid },
    /// Remove a route from favorites
    Remove { route_id: Uuid },
}

#[derive(Debug, Subcommand)]
pub enum CommentsCommand {
    /// Show the comments on a route
    List { route_id: Uuid },
    /// Comment on a route
    Add { route_id: Uuid, text: String },
    /// Delete a comment
    Delete { comment_id: Uuid },
}
