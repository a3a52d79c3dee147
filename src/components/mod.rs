pub mod topicmap;
