pub mod mdp;
pub mod xpm;
