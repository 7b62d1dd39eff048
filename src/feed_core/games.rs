//! Known place ids and the game names the auto-join filter matches on

/// (place id, game name)
const KNOWN_GAMES: [(&str, &str); 5] = [
    ("8737602449", "Main"),
    ("8943844393", "Voice Chat"),
    ("8943846005", "Legacy Map"),
    ("15611066348", "Deluxe Voice Chat"),
    ("18852429314", "17+"),
];

/// Map a place id to its game name, if it is one we know.
pub fn game_name(place_id: &str) -> Option<&'static str> {
    KNOWN_GAMES
        .iter()
        .find(|(id, _)| *id == place_id)
        .map(|(_, name)| *name)
}

/// All known game names, in catalog order.
pub fn all_game_names() -> impl Iterator<Item = &'static str> {
    KNOWN_GAMES.iter().map(|(_, name)| *name)
}

pub fn is_known_game(name: &str) -> bool {
    all_game_names().any(|known| known == name)
}
